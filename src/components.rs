//! Shared view components: the checklist navigation, the song picker, and
//! the lightbox overlay.

use aurore::Lang;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{HtmlAudioElement, HtmlSelectElement, KeyboardEvent};
use yew::prelude::*;

use crate::config;
use crate::{Page, Route};

struct NavItem {
    id: &'static str,
    route: Route,
    label: &'static str,
}

fn nav_items(lang: Lang) -> Vec<NavItem> {
    let page = |page| Route { page, lang };
    let mut items = vec![
        NavItem {
            id: "item1",
            route: page(Page::Aurore),
            label: match lang {
                Lang::En => "My name is Aurore Delune",
                Lang::Fr => "Je m'appelle Aurore Delune",
            },
        },
        NavItem {
            id: "item2",
            route: page(Page::Topography),
            label: match lang {
                Lang::En => "Topography of the Strange",
                Lang::Fr => "Topographie de l'étrange",
            },
        },
        NavItem {
            id: "item3",
            route: page(Page::Relics),
            label: match lang {
                Lang::En => "Relics of the Dream",
                Lang::Fr => "Reliques du rêve",
            },
        },
        NavItem {
            id: "item4",
            route: page(Page::Memories),
            label: match lang {
                Lang::En => "Memories of Mount Songe",
                Lang::Fr => "Mémoires du Mont Songe",
            },
        },
    ];
    // The language switch points at the other locale's home page.
    items.push(NavItem {
        id: "item5",
        route: Route {
            page: Page::Home,
            lang: match lang {
                Lang::En => Lang::Fr,
                Lang::Fr => Lang::En,
            },
        },
        label: match lang {
            Lang::En => "Mon site existe aussi en français",
            Lang::Fr => "My site also exists in English",
        },
    });
    items
}

#[derive(Properties, PartialEq)]
pub struct ChecklistProps {
    pub route: Route,
    pub onnavigate: Callback<Route>,
}

/// The checkbox-styled page navigation shown on every page.
#[function_component(Checklist)]
pub fn checklist(props: &ChecklistProps) -> Html {
    html! {
        <div class="checklist">
            <ul>
                { for nav_items(props.route.lang).into_iter().map(|item| {
                    let onclick = {
                        let onnavigate = props.onnavigate.clone();
                        let target = item.route;
                        Callback::from(move |e: MouseEvent| {
                            e.prevent_default();
                            onnavigate.emit(target);
                        })
                    };
                    html! {
                        <li key={item.id}>
                            <input type="checkbox" id={item.id} checked={props.route == item.route} />
                            <label for={item.id}>
                                <a href={item.route.path()} {onclick}>{ item.label }</a>
                            </label>
                        </li>
                    }
                }) }
            </ul>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct SongSelectProps {
    pub lang: Lang,
}

/// Dropdown that retargets the persistent audio player.
#[function_component(SongSelect)]
pub fn song_select(props: &SongSelectProps) -> Html {
    let placeholder = match props.lang {
        Lang::En => "songs",
        Lang::Fr => "chansons",
    };
    let options = [
        (String::new(), placeholder.to_string()),
        (config::asset_url("audio/song1.wav"), "Stray".to_string()),
        (config::asset_url("audio/song2.wav"), "deep Forest".to_string()),
    ];
    let onchange = Callback::from(|e: Event| {
        let select: HtmlSelectElement = e.target_unchecked_into();
        let selected = select.value();
        if selected.is_empty() {
            return;
        }
        let Some(player) = gloo_utils::document()
            .get_element_by_id("audio-player")
            .and_then(|el| el.dyn_into::<HtmlAudioElement>().ok())
        else {
            return;
        };
        let _ = player.pause();
        player.set_src(&selected);
        player.load();
        let _ = player.play();
    });
    html! {
        <div class="simple-dropdown">
            <select id="tech-select" {onchange}>
                { for options.iter().map(|(value, label)| html! {
                    <option value={value.clone()}>{ label }</option>
                }) }
            </select>
        </div>
    }
}

/// What the lightbox is currently showing.
#[derive(Clone, PartialEq)]
pub struct LightboxContent {
    pub src: String,
    pub caption: String,
    pub description: Option<String>,
}

#[derive(Properties, PartialEq)]
pub struct LightboxProps {
    pub content: Option<LightboxContent>,
    pub onclose: Callback<()>,
}

/// Full-screen overlay for a single image; closes on Escape, backdrop click,
/// or the close button.
#[function_component(Lightbox)]
pub fn lightbox(props: &LightboxProps) -> Html {
    let open = props.content.is_some();

    {
        let onclose = props.onclose.clone();
        use_effect_with(open, move |&open| {
            let document = gloo_utils::document();
            let listener = open.then(|| {
                let handler = Closure::<dyn FnMut(KeyboardEvent)>::new(move |e: KeyboardEvent| {
                    if e.key() == "Escape" {
                        onclose.emit(());
                    }
                });
                let _ = document
                    .add_event_listener_with_callback("keydown", handler.as_ref().unchecked_ref());
                handler
            });
            if let Some(body) = gloo_utils::document().body() {
                let overflow = if open { "hidden" } else { "unset" };
                let _ = body.style().set_property("overflow", overflow);
            }
            move || {
                if let Some(handler) = listener {
                    let _ = gloo_utils::document().remove_event_listener_with_callback(
                        "keydown",
                        handler.as_ref().unchecked_ref(),
                    );
                }
                if let Some(body) = gloo_utils::document().body() {
                    let _ = body.style().set_property("overflow", "unset");
                }
            }
        });
    }

    let Some(content) = props.content.clone() else {
        return Html::default();
    };

    let close_overlay = {
        let onclose = props.onclose.clone();
        Callback::from(move |_: MouseEvent| onclose.emit(()))
    };
    let close_button = {
        let onclose = props.onclose.clone();
        Callback::from(move |_: MouseEvent| onclose.emit(()))
    };
    let swallow = Callback::from(|e: MouseEvent| e.stop_propagation());

    html! {
        <div id="overlay" onclick={close_overlay}>
            <div class="lightbox" onclick={swallow}>
                <button class="close-button" onclick={close_button}>{ "×" }</button>
                <div class="lightbox-content">
                    <div class="lightbox-image-container">
                        <img id="lightbox-image" src={content.src} alt="" />
                    </div>
                    <div class="lightbox-text">
                        if !content.caption.is_empty() {
                            <h3 id="lightbox-caption">{ content.caption.clone() }</h3>
                        }
                        if let Some(description) = content.description.clone() {
                            <p id="lightbox-description">{ description }</p>
                        }
                    </div>
                </div>
            </div>
        </div>
    }
}
