//! Persistent audio player: the fixed `<audio controls>` element whose
//! track, position, and playing state survive navigation and reloads via
//! localStorage.

use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{AddEventListenerOptions, HtmlAudioElement, Storage};
use yew::prelude::*;

const KEY_SRC: &str = "audioSrc";
const KEY_TIME: &str = "audioTime";
const KEY_PLAYING: &str = "audioPlaying";

fn storage() -> Option<Storage> {
    gloo_utils::window().local_storage().ok().flatten()
}

fn read(key: &str) -> Option<String> {
    storage()?.get_item(key).ok().flatten()
}

fn write(key: &str, value: &str) {
    if let Some(storage) = storage() {
        let _ = storage.set_item(key, value);
    }
}

struct AudioListeners {
    audio: HtmlAudioElement,
    on_time: Closure<dyn FnMut()>,
    on_play: Closure<dyn FnMut()>,
    on_pause: Closure<dyn FnMut()>,
}

impl AudioListeners {
    fn detach(&self) {
        let _ = self.audio.remove_event_listener_with_callback(
            "timeupdate",
            self.on_time.as_ref().unchecked_ref(),
        );
        let _ = self
            .audio
            .remove_event_listener_with_callback("play", self.on_play.as_ref().unchecked_ref());
        let _ = self
            .audio
            .remove_event_listener_with_callback("pause", self.on_pause.as_ref().unchecked_ref());
    }
}

fn attach(audio: HtmlAudioElement) -> AudioListeners {
    let saved_src = read(KEY_SRC).unwrap_or_default();
    let saved_time = read(KEY_TIME)
        .and_then(|t| t.parse::<f64>().ok())
        .unwrap_or(0.0);
    let saved_playing = read(KEY_PLAYING).as_deref() == Some("true");

    if !saved_src.is_empty() {
        audio.set_src(&saved_src);
        let restored = audio.clone();
        let on_loaded = Closure::<dyn FnMut()>::new(move || {
            if saved_time.is_finite() {
                restored.set_current_time(saved_time);
            }
            if saved_playing {
                let _ = restored.play();
            }
        });
        let options = AddEventListenerOptions::new();
        options.set_once(true);
        let _ = audio.add_event_listener_with_callback_and_add_event_listener_options(
            "loadedmetadata",
            on_loaded.as_ref().unchecked_ref(),
            &options,
        );
        // Once-only listener; the browser discards it after it fires.
        on_loaded.forget();
    }

    let on_time = {
        let audio = audio.clone();
        Closure::<dyn FnMut()>::new(move || write(KEY_TIME, &audio.current_time().to_string()))
    };
    let on_play = {
        let audio = audio.clone();
        Closure::<dyn FnMut()>::new(move || {
            write(KEY_SRC, &audio.src());
            write(KEY_PLAYING, "true");
        })
    };
    let on_pause = Closure::<dyn FnMut()>::new(move || write(KEY_PLAYING, "false"));

    let _ = audio
        .add_event_listener_with_callback("timeupdate", on_time.as_ref().unchecked_ref());
    let _ = audio.add_event_listener_with_callback("play", on_play.as_ref().unchecked_ref());
    let _ = audio.add_event_listener_with_callback("pause", on_pause.as_ref().unchecked_ref());

    AudioListeners {
        audio,
        on_time,
        on_play,
        on_pause,
    }
}

#[function_component(AudioPlayer)]
pub fn audio_player() -> Html {
    let audio_ref = use_node_ref();

    {
        let audio_ref = audio_ref.clone();
        use_effect_with((), move |_| {
            let listeners = audio_ref.cast::<HtmlAudioElement>().map(attach);
            move || {
                if let Some(listeners) = listeners {
                    listeners.detach();
                }
            }
        });
    }

    html! {
        <audio
            id="audio-player"
            class="audio-player"
            ref={audio_ref}
            preload="metadata"
            controls=true
        />
    }
}
