//! Browser bindings: `<video>` elements as media handles and the address bar.
//!
//! Only built for `wasm32`. Each handle forwards its element's `loadeddata`,
//! `error` and `ended` events to the controller's media event channel as
//! `MediaEvent`s for the entry it was created for; the listeners are removed when the handle is dropped.

use log::{debug, warn};
use tokio::sync::{mpsc::UnboundedSender, oneshot};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{window, DomException, HtmlVideoElement};

use crate::{
    media_binding::{MediaError, MediaHandle, PlayRequest},
    playlist::EntryId,
    protocol::{MediaEvent, MediaEventKind},
    share_link::AddressBar,
};

const FORWARDED_EVENTS: [(&str, MediaEventKind); 3] = [
    ("loadeddata", MediaEventKind::Loaded),
    ("error", MediaEventKind::Failed),
    ("ended", MediaEventKind::Ended),
];

/// Media handle over a rendered `<video>` element.
pub struct VideoElementHandle {
    video: HtmlVideoElement,
    listeners: Vec<(&'static str, Closure<dyn FnMut()>)>,
}

impl VideoElementHandle {
    /// `media_events` is usually `SyncController::media_event_sender()`.
    pub fn new(
        video: HtmlVideoElement,
        entry: EntryId,
        media_events: UnboundedSender<MediaEvent>,
    ) -> Self {
        let mut listeners = Vec::with_capacity(FORWARDED_EVENTS.len());
        for (event_name, kind) in FORWARDED_EVENTS {
            let media_events = media_events.clone();
            let listener = Closure::<dyn FnMut()>::new(move || {
                let _ = media_events.send(MediaEvent::new(entry, kind));
            });
            if let Err(err) = video
                .add_event_listener_with_callback(event_name, listener.as_ref().unchecked_ref())
            {
                warn!(
                    "VideoElementHandle: failed to listen for {} on entry {}: {:?}",
                    event_name, entry, err
                );
                continue;
            }
            listeners.push((event_name, listener));
        }
        Self { video, listeners }
    }

    pub fn video_element(&self) -> &HtmlVideoElement {
        &self.video
    }
}

impl Drop for VideoElementHandle {
    fn drop(&mut self) {
        for (event_name, listener) in self.listeners.drain(..) {
            let _ = self
                .video
                .remove_event_listener_with_callback(event_name, listener.as_ref().unchecked_ref());
        }
    }
}

fn media_error_from_js(err: JsValue) -> MediaError {
    let Some(exception) = err.dyn_ref::<DomException>() else {
        return MediaError::Aborted(format!("{:?}", err));
    };
    let message = exception.message();
    match exception.name().as_str() {
        "NotAllowedError" => MediaError::NotAllowed(message),
        "NotSupportedError" => MediaError::NotSupported(message),
        _ => MediaError::Aborted(message),
    }
}

impl MediaHandle for VideoElementHandle {
    fn play(&mut self) -> PlayRequest {
        let (sender, receiver) = oneshot::channel();
        match self.video.play() {
            Ok(promise) => spawn_local(async move {
                let outcome = JsFuture::from(promise)
                    .await
                    .map(|_| ())
                    .map_err(media_error_from_js);
                let _ = sender.send(outcome);
            }),
            Err(err) => {
                let _ = sender.send(Err(media_error_from_js(err)));
            }
        }
        receiver
    }

    fn pause(&mut self) {
        if let Err(err) = self.video.pause() {
            debug!("VideoElementHandle: pause failed: {:?}", err);
        }
    }

    fn seek(&mut self, seconds: f64) {
        self.video.set_current_time(seconds);
    }

    fn current_time(&self) -> f64 {
        self.video.current_time()
    }

    fn set_source(&mut self, url: &str) {
        if self.video.src() != url {
            self.video.set_src(url);
            self.video.load();
        }
    }
}

/// Address bar of the current window.
#[derive(Debug, Default)]
pub struct BrowserAddressBar;

impl AddressBar for BrowserAddressBar {
    fn replace_query(&mut self, query: &str) {
        let Some(window) = window() else {
            warn!("BrowserAddressBar: no window available");
            return;
        };
        let path = window.location().pathname().unwrap_or_default();
        let result = window.history().and_then(|history| {
            history.replace_state_with_url(&JsValue::NULL, "", Some(&format!("{}{}", path, query)))
        });
        if let Err(err) = result {
            warn!("BrowserAddressBar: replaceState failed: {:?}", err);
        }
    }
}

/// Query string of the current page, including the leading `?`.
pub fn current_query() -> String {
    window()
        .and_then(|window| window.location().search().ok())
        .unwrap_or_default()
}
