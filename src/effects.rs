//! Ambient decorations: drifting flies, the typewriter reveal, and the
//! cursor hover trail. Decorative only; none of these hold page state.

use gloo_timers::callback::{Interval, Timeout};
use rand::Rng;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlElement, MouseEvent};
use yew::prelude::*;

use crate::config;
use crate::floating_gallery::viewport_size;
use crate::Route;

#[derive(Properties, PartialEq)]
pub struct TypewriterProps {
    pub text: String,
    #[prop_or(config::TYPE_SPEED_MS)]
    pub speed_ms: u32,
    #[prop_or(config::TYPE_START_DELAY_MS)]
    pub start_delay_ms: u32,
}

/// Reveals `text` one character at a time after a short delay.
#[function_component(Typewriter)]
pub fn typewriter(props: &TypewriterProps) -> Html {
    let shown = use_state(|| 0usize);
    let timers = use_mut_ref(|| (None::<Timeout>, None::<Interval>));

    {
        let shown = shown.clone();
        let timers = timers.clone();
        let speed = props.speed_ms;
        let delay = props.start_delay_ms;
        let len = props.text.chars().count();
        use_effect_with(props.text.clone(), move |_| {
            shown.set(0);
            let counter = Rc::new(Cell::new(0usize));
            let interval_slot = timers.clone();
            let timeout = Timeout::new(delay, move || {
                let ticker = Interval::new(speed, move || {
                    let next = counter.get() + 1;
                    if next <= len {
                        counter.set(next);
                        shown.set(next);
                    }
                });
                interval_slot.borrow_mut().1 = Some(ticker);
            });
            timers.borrow_mut().0 = Some(timeout);
            let timers = timers.clone();
            move || {
                *timers.borrow_mut() = (None, None);
            }
        });
    }

    let chars: Vec<char> = props.text.chars().collect();
    html! {
        <h2 class="type-h2" data-text={props.text.clone()}>
            { for chars.iter().take(*shown).map(|ch| html! {
                <span data-char={ch.to_string()}>{ ch.to_string() }</span>
            }) }
        </h2>
    }
}

#[derive(Properties, PartialEq)]
pub struct FliesProps {
    #[prop_or(true)]
    pub enabled: bool,
}

/// A handful of flies drifting across the viewport on randomized
/// CSS-transition hops.
#[function_component(Flies)]
pub fn flies(props: &FliesProps) -> Html {
    let fly_refs = use_memo((), |_| {
        (0..config::NUM_FLIES)
            .map(|_| NodeRef::default())
            .collect::<Vec<_>>()
    });
    let ticker = use_mut_ref(|| None::<Interval>);

    {
        let fly_refs = fly_refs.clone();
        let ticker = ticker.clone();
        use_effect_with(props.enabled, move |&enabled| {
            if enabled {
                // Each fly hops on its own cadence: once its transition ends,
                // the next tick hands it a new target and duration.
                let next_hop = Rc::new(RefCell::new(vec![0.0f64; config::NUM_FLIES]));
                let refs = fly_refs.clone();
                let interval = Interval::new(config::FLY_TICK_MS, move || {
                    let now = js_sys::Date::now();
                    let (width, height) = viewport_size();
                    let mut hops = next_hop.borrow_mut();
                    let mut rng = rand::rng();
                    for (slot, node) in hops.iter_mut().zip(refs.iter()) {
                        if now < *slot {
                            continue;
                        }
                        let Some(el) = node.cast::<HtmlElement>() else {
                            continue;
                        };
                        let x = rng.random_range(0.0..width.max(1.0));
                        let y = rng.random_range(0.0..height.max(1.0));
                        let duration = rng.random_range(3.0..6.0);
                        let style = el.style();
                        let _ = style.set_property(
                            "transition",
                            &format!("transform {}s linear", duration),
                        );
                        let _ = style
                            .set_property("transform", &format!("translate({}px, {}px)", x, y));
                        *slot = now + duration * 1000.0;
                    }
                });
                *ticker.borrow_mut() = Some(interval);
            } else {
                *ticker.borrow_mut() = None;
            }
            let ticker = ticker.clone();
            move || {
                *ticker.borrow_mut() = None;
            }
        });
    }

    if !props.enabled {
        return Html::default();
    }
    html! {
        <>
            { for fly_refs.iter().map(|node| html! {
                <img class="fly" ref={node.clone()} src={config::asset_url("images/fly.gif")} alt="" />
            }) }
        </>
    }
}

#[derive(Properties, PartialEq)]
pub struct HoverTrailProps {
    pub route: Route,
}

/// Leaves fading copies of the hovered heading word under the cursor.
#[function_component(HoverTrail)]
pub fn hover_trail(props: &HoverTrailProps) -> Html {
    use_effect_with(props.route, move |_| {
        wrap_words("h1, h2:not(.type-h2)");

        let active_word = Rc::new(RefCell::new(String::new()));
        let mouse_pos = Rc::new(Cell::new((0.0f64, 0.0f64)));

        let over = {
            let active = active_word.clone();
            Closure::<dyn FnMut(MouseEvent)>::new(move |e: MouseEvent| {
                let Some(target) = e.target().and_then(|t| t.dyn_into::<Element>().ok()) else {
                    return;
                };
                if let Ok(Some(span)) = target.closest(".hover-word") {
                    *active.borrow_mut() = span.text_content().unwrap_or_default();
                }
            })
        };
        let moved = {
            let pos = mouse_pos.clone();
            Closure::<dyn FnMut(MouseEvent)>::new(move |e: MouseEvent| {
                pos.set((e.page_x() as f64, e.page_y() as f64));
            })
        };
        let document = gloo_utils::document();
        let _ = document
            .add_event_listener_with_callback("mouseover", over.as_ref().unchecked_ref());
        let _ = document
            .add_event_listener_with_callback("mousemove", moved.as_ref().unchecked_ref());

        let interval = {
            let active = active_word.clone();
            let pos = mouse_pos.clone();
            Interval::new(config::TRAIL_INTERVAL_MS, move || {
                let word = active.borrow().clone();
                if word.is_empty() {
                    return;
                }
                let (x, y) = pos.get();
                spawn_trail(&word, x, y);
            })
        };

        move || {
            let document = gloo_utils::document();
            let _ = document
                .remove_event_listener_with_callback("mouseover", over.as_ref().unchecked_ref());
            let _ = document
                .remove_event_listener_with_callback("mousemove", moved.as_ref().unchecked_ref());
            drop(interval);
        }
    });
    Html::default()
}

/// Wrap each word of the matching headings in a hoverable span, once per
/// element.
fn wrap_words(selector: &str) {
    let document = gloo_utils::document();
    let Ok(nodes) = document.query_selector_all(selector) else {
        return;
    };
    for i in 0..nodes.length() {
        let Some(el) = nodes.item(i).and_then(|n| n.dyn_into::<Element>().ok()) else {
            continue;
        };
        if el.get_attribute("data-wrapped").as_deref() == Some("true") {
            continue;
        }
        let text = el.text_content().unwrap_or_default();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        let wrapped = text
            .split_whitespace()
            .map(|word| format!("<span class=\"hover-word\">{}</span>", word))
            .collect::<Vec<_>>()
            .join(" ");
        el.set_inner_html(&wrapped);
        let _ = el.set_attribute("data-wrapped", "true");
    }
}

fn spawn_trail(word: &str, x: f64, y: f64) {
    let document = gloo_utils::document();
    let Ok(span) = document.create_element("span") else {
        return;
    };
    span.set_class_name("trail");
    span.set_text_content(Some(word));
    if let Some(el) = span.dyn_ref::<HtmlElement>() {
        let style = el.style();
        let _ = style.set_property("left", &format!("{}px", x));
        let _ = style.set_property("top", &format!("{}px", y));
    }
    if let Some(body) = document.body() {
        let _ = body.append_child(&span);
    }
    let spent = span.clone();
    Timeout::new(config::TRAIL_LIFETIME_MS, move || spent.remove()).forget();
}
