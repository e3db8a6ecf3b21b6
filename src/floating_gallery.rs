//! Draggable floating image gallery.
//!
//! The engine in `aurore::gallery` owns the math and the drag state; this
//! component applies its output to the DOM: initial randomized layout,
//! pointer capture, and a requestAnimationFrame loop that eases the grabbed
//! figure toward the pointer. Activation fires only for genuine clicks.

use aurore::gallery::{
    layout_positions, DragBounds, DragController, GalleryItem, Point, SizeClass,
};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{HtmlElement, PointerEvent};
use yew::prelude::*;

use crate::config;

#[derive(Properties, PartialEq)]
pub struct FloatingGalleryProps {
    pub items: Vec<GalleryItem>,
    #[prop_or_default]
    pub on_activate: Callback<GalleryItem>,
}

pub(crate) fn viewport_size() -> (f64, f64) {
    let window = gloo_utils::window();
    let width = window
        .inner_width()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    let height = window
        .inner_height()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    (width, height)
}

fn apply_position(el: &HtmlElement, position: Point) {
    let style = el.style();
    let _ = style.set_property("left", &format!("{}px", position.x));
    let _ = style.set_property("top", &format!("{}px", position.y));
}

fn request_frame(tick: &Closure<dyn FnMut()>) -> i32 {
    gloo_utils::window()
        .request_animation_frame(tick.as_ref().unchecked_ref())
        .unwrap_or(0)
}

type TickSlot = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

fn start_frame_loop(
    controller: &Rc<RefCell<DragController>>,
    figure_refs: &Rc<Vec<NodeRef>>,
    raf_id: &Rc<RefCell<Option<i32>>>,
    raf_tick: &TickSlot,
) {
    // A second pointer grabbing mid-drag reuses the running loop.
    if raf_id.borrow().is_some() {
        return;
    }
    let controller = controller.clone();
    let figure_refs = figure_refs.clone();
    let raf_id_inner = raf_id.clone();
    let tick_slot = raf_tick.clone();
    let tick = Closure::<dyn FnMut()>::new(move || {
        let stepped = controller.borrow_mut().frame();
        match stepped {
            Some((figure, position)) => {
                if let Some(el) = figure_refs
                    .get(figure)
                    .and_then(|node| node.cast::<HtmlElement>())
                {
                    apply_position(&el, position);
                }
                let next = tick_slot.borrow().as_ref().map(request_frame);
                *raf_id_inner.borrow_mut() = next;
            }
            None => {
                *raf_id_inner.borrow_mut() = None;
            }
        }
    });
    *raf_tick.borrow_mut() = Some(tick);
    let id = raf_tick.borrow().as_ref().map(request_frame);
    *raf_id.borrow_mut() = id;
}

/// Cancel the animation step synchronously so no late frame can move a
/// figure that was already released.
fn stop_frame_loop(raf_id: &Rc<RefCell<Option<i32>>>, raf_tick: &TickSlot) {
    if let Some(id) = raf_id.borrow_mut().take() {
        let _ = gloo_utils::window().cancel_animation_frame(id);
    }
    *raf_tick.borrow_mut() = None;
}

fn drag_bounds() -> DragBounds {
    let (width, height) = viewport_size();
    DragBounds {
        max_x: width - config::DRAG_KEEPIN_PX,
        max_y: height * config::DRAG_BOUNDS_HEIGHT_FACTOR - config::DRAG_KEEPIN_PX,
    }
}

#[function_component(FloatingGallery)]
pub fn floating_gallery(props: &FloatingGalleryProps) -> Html {
    let gallery_ref = use_node_ref();
    let figure_refs = use_memo(props.items.len(), |count| {
        (0..*count).map(|_| NodeRef::default()).collect::<Vec<_>>()
    });
    let controller = use_mut_ref(DragController::new);
    let raf_id = use_mut_ref(|| None::<i32>);
    let raf_tick: TickSlot = use_mut_ref(|| None);

    // Randomize figure positions once per mount (and whenever the item set
    // changes), sizing the canvas to the viewport.
    {
        let gallery_ref = gallery_ref.clone();
        let figure_refs = figure_refs.clone();
        let sizes: Vec<SizeClass> = props.items.iter().map(|item| item.size).collect();
        use_effect_with(props.items.clone(), move |_| {
            let (width, height) = viewport_size();
            let mut rng = rand::rng();
            let layout = layout_positions(&sizes, width, height, &mut rng);
            if layout.canvas_height > 0.0 {
                if let Some(gallery) = gallery_ref.cast::<HtmlElement>() {
                    let _ = gallery
                        .style()
                        .set_property("height", &format!("{}px", layout.canvas_height));
                }
            }
            if layout.positions.len() == figure_refs.len() {
                for (node, position) in figure_refs.iter().zip(&layout.positions) {
                    if let Some(el) = node.cast::<HtmlElement>() {
                        apply_position(&el, *position);
                    }
                }
            }
            || ()
        });
    }

    // Cancel any in-flight animation when the gallery unmounts.
    {
        let raf_id = raf_id.clone();
        let raf_tick = raf_tick.clone();
        use_effect_with((), move |_| move || stop_frame_loop(&raf_id, &raf_tick));
    }

    let figures = props.items.iter().enumerate().map(|(idx, item)| {
        let onpointerdown = {
            let gallery_ref = gallery_ref.clone();
            let figure_refs = figure_refs.clone();
            let controller = controller.clone();
            let raf_id = raf_id.clone();
            let raf_tick = raf_tick.clone();
            Callback::from(move |e: PointerEvent| {
                let Some(gallery) = gallery_ref.cast::<HtmlElement>() else {
                    return;
                };
                let Some(figure) = figure_refs
                    .get(idx)
                    .and_then(|node| node.cast::<HtmlElement>())
                else {
                    return;
                };
                let gallery_rect = gallery.get_bounding_client_rect();
                let figure_rect = figure.get_bounding_client_rect();
                let pointer = Point::new(
                    e.client_x() as f64 - gallery_rect.left(),
                    e.client_y() as f64 - gallery_rect.top(),
                );
                let origin = Point::new(
                    figure_rect.left() - gallery_rect.left(),
                    figure_rect.top() - gallery_rect.top(),
                );
                let z = controller.borrow_mut().begin(idx, pointer, origin);
                let style = figure.style();
                let _ = style.set_property("z-index", &z.to_string());
                let _ = style.set_property("cursor", "grabbing");
                let _ = figure.set_pointer_capture(e.pointer_id());
                e.prevent_default();
                start_frame_loop(&controller, &figure_refs, &raf_id, &raf_tick);
            })
        };

        let onpointermove = {
            let gallery_ref = gallery_ref.clone();
            let controller = controller.clone();
            Callback::from(move |e: PointerEvent| {
                if controller.borrow().active_figure() != Some(idx) {
                    return;
                }
                let Some(gallery) = gallery_ref.cast::<HtmlElement>() else {
                    return;
                };
                let rect = gallery.get_bounding_client_rect();
                let pointer = Point::new(
                    e.client_x() as f64 - rect.left(),
                    e.client_y() as f64 - rect.top(),
                );
                controller.borrow_mut().pointer_moved(pointer, &drag_bounds());
                e.prevent_default();
            })
        };

        let finish = {
            let figure_refs = figure_refs.clone();
            let controller = controller.clone();
            let raf_id = raf_id.clone();
            let raf_tick = raf_tick.clone();
            let on_activate = props.on_activate.clone();
            let item = item.clone();
            Callback::from(move |e: PointerEvent| {
                if controller.borrow().active_figure() != Some(idx) {
                    return;
                }
                stop_frame_loop(&raf_id, &raf_tick);
                let outcome = controller.borrow_mut().release();
                if let Some(figure) = figure_refs
                    .get(idx)
                    .and_then(|node| node.cast::<HtmlElement>())
                {
                    let _ = figure.style().set_property("cursor", "grab");
                    let _ = figure.release_pointer_capture(e.pointer_id());
                }
                if let Some(outcome) = outcome {
                    if !outcome.was_drag {
                        on_activate.emit(item.clone());
                    }
                }
            })
        };

        let class = if item.size.emphasized() {
            classes!("floating-figure", "big-figure")
        } else {
            classes!("floating-figure")
        };
        let caption_class = if item.size.emphasized() {
            classes!("figure-caption", "figure-caption-big")
        } else {
            classes!("figure-caption")
        };

        html! {
            <figure
                key={idx}
                {class}
                ref={figure_refs[idx].clone()}
                {onpointerdown}
                {onpointermove}
                onpointerup={finish.clone()}
                onpointercancel={finish}
            >
                <img src={item.image_source.clone()} alt="" draggable="false" />
                <figcaption class={caption_class}>{ item.caption.clone() }</figcaption>
            </figure>
        }
    });

    html! {
        <div class="floating-gallery" id="floating-gallery" ref={gallery_ref.clone()}>
            { for figures }
        </div>
    }
}
