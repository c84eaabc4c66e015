use posthog_rs::Event;

use crate::error::ErrorKind;

fn capture_async(event: Event) {
    tokio::spawn(async move {
        if let Err(e) = posthog_rs::capture(event).await {
            tracing::error!("Failed to capture posthog event: {}", e);
        }
    });
}

pub fn track_update_check(channel: &str, current_version: Option<&str>, update_available: bool) {
    let mut event = Event::new_anon("update_check");
    event.insert_prop("channel", channel).ok();
    if let Some(v) = current_version {
        event.insert_prop("current_version", v).ok();
    }
    event.insert_prop("update_available", update_available).ok();
    capture_async(event);
}

pub fn track_update_check_failed(channel: &str, current_version: Option<&str>, kind: ErrorKind) {
    let mut event = Event::new_anon("update_check_failed");
    event.insert_prop("channel", channel).ok();
    if let Some(v) = current_version {
        event.insert_prop("current_version", v).ok();
    }
    event.insert_prop("error_kind", kind.as_str()).ok();
    capture_async(event);
}

pub fn track_manifest_request(line_count: usize) {
    let mut event = Event::new_anon("manifest_request");
    event.insert_prop("line_count", line_count).ok();
    capture_async(event);
}
