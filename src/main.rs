//! Main module for the Aurore Delune portfolio site using Yew.
//! Wires routes, the layout shell, and the content-backed pages.

use aurore::gallery::{gallery_items, GalleryItem};
use aurore::imageref::normalize_image_reference;
use aurore::Lang;
use gloo_timers::callback::{Interval, Timeout};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{HtmlAudioElement, HtmlElement, HtmlInputElement, HtmlTextAreaElement};
use yew::prelude::*;

mod audio;
mod components;
mod config;
mod effects;
mod floating_gallery;
mod hooks;
mod sheets;

use audio::AudioPlayer;
use components::{Checklist, Lightbox, LightboxContent, SongSelect};
use effects::{Flies, HoverTrail, Typewriter};
use floating_gallery::FloatingGallery;
use hooks::use_content_set;
use sheets::StoreHandle;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    Aurore,
    Topography,
    Relics,
    Memories,
}

/// A routed location: which page, in which locale. Paths under `/en` select
/// English; everything else is French.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub page: Page,
    pub lang: Lang,
}

impl Route {
    pub fn parse(path: &str) -> Self {
        let (lang, rest) = if path == "/en" || path.starts_with("/en/") {
            (Lang::En, &path[3..])
        } else {
            (Lang::Fr, path)
        };
        let page = match rest.trim_matches('/') {
            "page1" => Page::Aurore,
            "page2" => Page::Topography,
            "page3" => Page::Relics,
            "page4" => Page::Memories,
            _ => Page::Home,
        };
        Route { page, lang }
    }

    pub fn path(self) -> String {
        let suffix = match self.page {
            Page::Home => "",
            Page::Aurore => "/page1",
            Page::Topography => "/page2",
            Page::Relics => "/page3",
            Page::Memories => "/page4",
        };
        match self.lang {
            Lang::En => format!("/en{}", suffix),
            Lang::Fr if suffix.is_empty() => "/".to_string(),
            Lang::Fr => suffix.to_string(),
        }
    }

    pub fn is_home(self) -> bool {
        self.page == Page::Home
    }
}

fn current_path() -> String {
    gloo_utils::window()
        .location()
        .pathname()
        .unwrap_or_else(|_| "/".to_string())
}

#[derive(Properties, PartialEq)]
struct ShellProps {
    route: Route,
    children: Html,
}

/// Chrome shared by every page: hover trail, persistent audio, home-only
/// flies, scroll reset, and background warm-up of all four content sets.
#[function_component(LayoutShell)]
fn layout_shell(props: &ShellProps) -> Html {
    let store = use_context::<StoreHandle>().expect("content store context missing");

    use_effect_with(props.route.is_home(), |&is_home| {
        if let Some(body) = gloo_utils::document().body() {
            let classes = body.class_list();
            let _ = if is_home {
                classes.add_1("home")
            } else {
                classes.remove_1("home")
            };
        }
        || ()
    });

    use_effect_with(props.route, |_| {
        gloo_utils::window().scroll_to_with_x_and_y(0.0, 0.0);
        || ()
    });

    {
        let store = store.clone();
        use_effect_with((), move |_| {
            for sheet in config::ALL_SHEETS {
                let pending = store.preload(sheet);
                wasm_bindgen_futures::spawn_local(async move {
                    let _ = pending.await;
                });
            }
            || ()
        });
    }

    html! {
        <div class="container cursive-glow">
            <HoverTrail route={props.route} />
            { props.children.clone() }
            <AudioPlayer />
            <Flies enabled={props.route.is_home()} />
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct LayoutProps {
    route: Route,
    onnavigate: Callback<Route>,
    children: Html,
}

/// Per-page frame: the home logo (with its sound-effect cycle) and the main
/// content column.
#[function_component(Layout)]
fn layout(props: &LayoutProps) -> Html {
    let sfx_ref = use_node_ref();
    let logo_ref = use_node_ref();
    let sfx_index = use_mut_ref(|| 0usize);

    let play_next_sfx = {
        let sfx_ref = sfx_ref.clone();
        let sfx_index = sfx_index.clone();
        Rc::new(move || {
            let Some(audio) = sfx_ref.cast::<HtmlAudioElement>() else {
                return;
            };
            let idx = *sfx_index.borrow() % config::SFX_FILES.len();
            audio.set_src(&config::asset_url(config::SFX_FILES[idx]));
            *sfx_index.borrow_mut() += 1;
            audio.set_loop(false);
            let _ = audio.pause();
            audio.set_current_time(0.0);
            audio.load();
            let _ = audio.play();
        })
    };

    // Keep playing through the cycle: when one effect ends, start the next
    // unless the cycle just wrapped.
    {
        let sfx_ref = sfx_ref.clone();
        let sfx_index = sfx_index.clone();
        let play_next = play_next_sfx.clone();
        use_effect_with((), move |_| {
            let listener = sfx_ref.cast::<HtmlAudioElement>().map(|audio| {
                let on_ended = Closure::<dyn FnMut()>::new(move || {
                    if *sfx_index.borrow() % config::SFX_FILES.len() != 0 {
                        (*play_next)();
                    }
                });
                let _ = audio
                    .add_event_listener_with_callback("ended", on_ended.as_ref().unchecked_ref());
                (audio, on_ended)
            });
            move || {
                if let Some((audio, on_ended)) = listener {
                    let _ = audio.remove_event_listener_with_callback(
                        "ended",
                        on_ended.as_ref().unchecked_ref(),
                    );
                }
            }
        });
    }

    let onlogoclick = {
        let route = props.route;
        let onnavigate = props.onnavigate.clone();
        let logo_ref = logo_ref.clone();
        let play_next = play_next_sfx.clone();
        Callback::from(move |_: MouseEvent| {
            if let Some(img) = logo_ref.cast::<HtmlElement>() {
                let _ = img.class_list().add_1("glow");
                let img = img.clone();
                Timeout::new(config::LOGO_GLOW_MS, move || {
                    let _ = img.class_list().remove_1("glow");
                })
                .forget();
            }
            if !route.is_home() {
                onnavigate.emit(Route {
                    page: Page::Home,
                    lang: route.lang,
                });
                return;
            }
            (*play_next)();
        })
    };

    html! {
        <>
            <button class="home-logo" onclick={onlogoclick}>
                <img ref={logo_ref} src={config::asset_url("images/orchidd.jpg")} alt="Home" />
            </button>
            <div class="main-content">{ props.children.clone() }</div>
            <audio ref={sfx_ref} style="display:none" />
        </>
    }
}

#[derive(Properties, PartialEq)]
struct PageProps {
    route: Route,
    onnavigate: Callback<Route>,
}

#[function_component(Home)]
fn home(props: &PageProps) -> Html {
    html! {
        <Layout route={props.route} onnavigate={props.onnavigate.clone()}>
            <Checklist route={props.route} onnavigate={props.onnavigate.clone()} />
            <SongSelect lang={props.route.lang} />
        </Layout>
    }
}

#[function_component(PageAurore)]
fn page_aurore(props: &PageProps) -> Html {
    let content = use_content_set(config::SHEET_AURORE);
    let lang = props.route.lang;
    let name_ref = use_node_ref();
    let email_ref = use_node_ref();
    let message_ref = use_node_ref();

    let Some(first) = content.first().cloned() else {
        return html! {
            <Layout route={props.route} onnavigate={props.onnavigate.clone()}>
                <Checklist route={props.route} onnavigate={props.onnavigate.clone()} />
                <SongSelect lang={lang} />
            </Layout>
        };
    };

    let title = first.localized("title", lang).to_string();
    let subtitle = first.localized("content", lang).to_string();
    let image_url = {
        let raw = first.text("image_url");
        (!raw.is_empty()).then(|| normalize_image_reference(raw, config::asset_base()))
    };
    let form_title = first.text("form_title").to_string();
    let form_description = first.text("form_description").to_string();

    let onsubmit = {
        let name_ref = name_ref.clone();
        let email_ref = email_ref.clone();
        let message_ref = message_ref.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            let name = name_ref
                .cast::<HtmlInputElement>()
                .map(|i| i.value())
                .unwrap_or_default();
            let email = email_ref
                .cast::<HtmlInputElement>()
                .map(|i| i.value())
                .unwrap_or_default();
            let message = message_ref
                .cast::<HtmlTextAreaElement>()
                .map(|t| t.value())
                .unwrap_or_default();
            let body = format!("{}\n{}\n\n{}", name.trim(), email.trim(), message.trim());
            let mailto = format!(
                "mailto:{}?subject={}&body={}",
                config::CONTACT_ADDRESS,
                sheets::encode("Website"),
                sheets::encode(&body),
            );
            let _ = gloo_utils::window().location().set_href(&mailto);
        })
    };

    let (name_label, email_label, message_label, send_label) = match lang {
        Lang::En => ("Your name:", "Your email:", "Your message:", "Send"),
        Lang::Fr => ("Votre nom :", "Votre email :", "Votre message:", "Envoyer"),
    };

    html! {
        <Layout route={props.route} onnavigate={props.onnavigate.clone()}>
            <div class="content-box page1">
                <h1>{ title }</h1>
                if !subtitle.is_empty() {
                    <div class="type-container">
                        <Typewriter text={subtitle.clone()} />
                    </div>
                }
                if !form_title.is_empty() {
                    <h2>{ form_title.clone() }</h2>
                }
                if !form_description.is_empty() {
                    <p>{ form_description.clone() }</p>
                }
                <form id="contactForm" {onsubmit}>
                    <label for="name">{ name_label }</label><br/>
                    <input type="text" id="name" name="name" ref={name_ref} required=true /><br/><br/>
                    <label for="email">{ email_label }</label><br/>
                    <input type="email" id="email" name="email" ref={email_ref} required=true /><br/><br/>
                    <label for="message">{ message_label }</label><br/>
                    <textarea id="message" name="message" rows="5" ref={message_ref} required=true />
                    <br/><br/>
                    <button type="submit">{ send_label }</button>
                </form>
            </div>
            if let Some(src) = image_url.clone() {
                <img src={src} height="200" class="page1-image" alt="" />
            }
            <Checklist route={props.route} onnavigate={props.onnavigate.clone()} />
            <SongSelect lang={lang} />
        </Layout>
    }
}

#[function_component(PageTopography)]
fn page_topography(props: &PageProps) -> Html {
    let content = use_content_set(config::SHEET_TOPOGRAPHY);
    let lang = props.route.lang;
    let lightbox = use_state(|| None::<LightboxContent>);

    let (title, subtitle) = match lang {
        Lang::En => (
            "Topography of the Strange",
            "The sacred in the profane, beauty amid decay",
        ),
        Lang::Fr => (
            "Topographie de l'étrange",
            "Du sacré dans le profane, de la beauté dans la décrépitude",
        ),
    };

    let items = gallery_items(&content.rows, lang, config::asset_base());

    let on_activate = {
        let lightbox = lightbox.clone();
        Callback::from(move |item: GalleryItem| {
            lightbox.set(Some(LightboxContent {
                src: item.image_source.clone(),
                caption: item.caption.clone(),
                description: item.description.clone(),
            }));
        })
    };
    let onclose = {
        let lightbox = lightbox.clone();
        Callback::from(move |_| lightbox.set(None))
    };
    let retry_label = match lang {
        Lang::En => "try again",
        Lang::Fr => "réessayer",
    };

    html! {
        <Layout route={props.route} onnavigate={props.onnavigate.clone()}>
            <div class="content-box page2">
                <h1>{ title }</h1>
                <div class="type-container">
                    <Typewriter text={subtitle.to_string()} />
                </div>
                if content.loading && items.is_empty() {
                    <p class="loading-note">{ "…" }</p>
                }
                if content.error.is_some() {
                    <button class="retry-button" onclick={content.refresh.reform(|_| ())}>
                        { retry_label }
                    </button>
                }
            </div>
            if !items.is_empty() {
                <FloatingGallery items={items} {on_activate} />
            }
            <Checklist route={props.route} onnavigate={props.onnavigate.clone()} />
            <SongSelect lang={lang} />
            <Lightbox content={(*lightbox).clone()} {onclose} />
        </Layout>
    }
}

#[function_component(PageRelics)]
fn page_relics(props: &PageProps) -> Html {
    let content = use_content_set(config::SHEET_RELICS);
    let lang = props.route.lang;
    let lightbox = use_state(|| None::<LightboxContent>);

    let Some(row) = content.first().cloned() else {
        return html! {
            <Layout route={props.route} onnavigate={props.onnavigate.clone()}>
                <Checklist route={props.route} onnavigate={props.onnavigate.clone()} />
                <SongSelect lang={lang} />
            </Layout>
        };
    };

    let title = row.localized("title", lang).to_string();
    let typed = row.localized("content", lang).to_string();
    let description = row.localized("description", lang).to_string();
    let image_url = {
        let raw = row.text("image_url");
        (!raw.is_empty()).then(|| normalize_image_reference(raw, config::asset_base()))
    };

    let onimageclick = {
        let lightbox = lightbox.clone();
        let src = image_url.clone().unwrap_or_default();
        let caption = title.clone();
        let description = description.clone();
        Callback::from(move |_: MouseEvent| {
            lightbox.set(Some(LightboxContent {
                src: src.clone(),
                caption: caption.clone(),
                description: (!description.is_empty()).then(|| description.clone()),
            }));
        })
    };
    let onclose = {
        let lightbox = lightbox.clone();
        Callback::from(move |_| lightbox.set(None))
    };

    html! {
        <Layout route={props.route} onnavigate={props.onnavigate.clone()}>
            <div class="content-box page3">
                <div class="main-content">
                    <h1>{ title.clone() }</h1>
                    <div class="type-container">
                        <Typewriter text={typed.clone()} />
                    </div>
                    if let Some(src) = image_url.clone() {
                        <img src={src} alt="" class="page3-main-image" onclick={onimageclick} />
                    }
                </div>
                <Checklist route={props.route} onnavigate={props.onnavigate.clone()} />
                <SongSelect lang={lang} />
            </div>
            <Lightbox content={(*lightbox).clone()} {onclose} />
        </Layout>
    }
}

#[function_component(PageMemories)]
fn page_memories(props: &PageProps) -> Html {
    let content = use_content_set(config::SHEET_MEMORIES);
    let lang = props.route.lang;

    if content.rows.is_empty() {
        return html! {
            <Layout route={props.route} onnavigate={props.onnavigate.clone()}>
                <Checklist route={props.route} onnavigate={props.onnavigate.clone()} />
                <SongSelect lang={lang} />
            </Layout>
        };
    }

    let text_of = |kind: &str| {
        content
            .rows
            .iter()
            .find(|row| row.text("text_type").eq_ignore_ascii_case(kind))
            .map(|row| row.localized("content", lang).to_string())
            .filter(|text| !text.is_empty())
    };
    let intro = text_of("introductory_quote");
    let main_content = text_of("main_content");

    let title = match lang {
        Lang::En => "Memories of Mount Songe",
        Lang::Fr => "Mémoires du Mont Songe",
    };

    html! {
        <Layout route={props.route} onnavigate={props.onnavigate.clone()}>
            <div class="content-box page4">
                <h1>{ title }</h1>
                if let Some(intro) = intro.clone() {
                    <blockquote>
                        <p>
                            { for intro.lines().map(|line| html! {
                                <span>{ line.to_string() }<br/></span>
                            }) }
                        </p>
                    </blockquote>
                }
            </div>
            if let Some(main_text) = main_content.clone() {
                <div class="poem page4-poem">
                    <blockquote>
                        { for main_text
                            .split("\n\n")
                            .filter(|para| !para.trim().is_empty())
                            .map(|para| html! { <p>{ para.trim_matches('\n').to_string() }</p> }) }
                    </blockquote>
                </div>
            }
            <Checklist route={props.route} onnavigate={props.onnavigate.clone()} />
            <SongSelect lang={lang} />
        </Layout>
    }
}

#[function_component(App)]
fn app() -> Html {
    let store = use_state(sheets::new_store_handle);
    let route = use_state(|| Route::parse(&current_path()));

    let onnavigate = {
        let route = route.clone();
        Callback::from(move |target: Route| {
            if *route == target {
                return;
            }
            if let Ok(history) = gloo_utils::window().history() {
                let _ = history.push_state_with_url(&JsValue::NULL, "", Some(&target.path()));
            }
            route.set(target);
        })
    };

    // Back/forward navigation re-parses the location.
    {
        let route = route.clone();
        use_effect_with((), move |_| {
            let listener = Closure::<dyn FnMut()>::new(move || {
                route.set(Route::parse(&current_path()));
            });
            let window = gloo_utils::window();
            let _ = window
                .add_event_listener_with_callback("popstate", listener.as_ref().unchecked_ref());
            move || {
                let _ = gloo_utils::window().remove_event_listener_with_callback(
                    "popstate",
                    listener.as_ref().unchecked_ref(),
                );
            }
        });
    }

    // Periodic expiry sweep over both cache tiers.
    {
        let store = (*store).clone();
        use_effect_with((), move |_| {
            let sweeper = Interval::new(config::CACHE_SWEEP_INTERVAL_MS, move || {
                store.sweep_expired();
            });
            move || drop(sweeper)
        });
    }

    let page = match route.page {
        Page::Home => html! { <Home route={*route} onnavigate={onnavigate.clone()} /> },
        Page::Aurore => html! { <PageAurore route={*route} onnavigate={onnavigate.clone()} /> },
        Page::Topography => {
            html! { <PageTopography route={*route} onnavigate={onnavigate.clone()} /> }
        }
        Page::Relics => html! { <PageRelics route={*route} onnavigate={onnavigate.clone()} /> },
        Page::Memories => html! { <PageMemories route={*route} onnavigate={onnavigate.clone()} /> },
    };

    html! {
        <ContextProvider<StoreHandle> context={(*store).clone()}>
            <LayoutShell route={*route}>
                { page }
            </LayoutShell>
        </ContextProvider<StoreHandle>>
    }
}

/// Entry point: logging, panic reporting, then the Yew renderer.
fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    console_error_panic_hook::set_once();
    yew::Renderer::<App>::new().render();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_parse_both_locales() {
        assert_eq!(
            Route::parse("/"),
            Route {
                page: Page::Home,
                lang: Lang::Fr
            }
        );
        assert_eq!(
            Route::parse("/en"),
            Route {
                page: Page::Home,
                lang: Lang::En
            }
        );
        assert_eq!(
            Route::parse("/page2"),
            Route {
                page: Page::Topography,
                lang: Lang::Fr
            }
        );
        assert_eq!(
            Route::parse("/en/page4"),
            Route {
                page: Page::Memories,
                lang: Lang::En
            }
        );
    }

    #[test]
    fn route_paths_round_trip() {
        for page in [
            Page::Home,
            Page::Aurore,
            Page::Topography,
            Page::Relics,
            Page::Memories,
        ] {
            for lang in [Lang::Fr, Lang::En] {
                let route = Route { page, lang };
                assert_eq!(Route::parse(&route.path()), route);
            }
        }
    }

    #[test]
    fn unknown_paths_fall_back_to_home() {
        assert_eq!(Route::parse("/nope").page, Page::Home);
        assert_eq!(Route::parse("/en/whatever").page, Page::Home);
        assert_eq!(Route::parse("/en/whatever").lang, Lang::En);
    }
}
