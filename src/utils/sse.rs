// src/utils/sse.rs

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, stream};

use crate::store::Subscription;

/// Streams a subscription as server-sent events named `event_name`.
///
/// The subscription is owned by the stream, so it is released as soon as the
/// client disconnects and axum drops the response body.
pub fn change_stream(
    subscription: Subscription,
    event_name: &'static str,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let events = stream::unfold(subscription, move |mut subscription| async move {
        let change = subscription.recv().await?;
        let event = Event::default().event(event_name).json_data(&change);
        Some((event, subscription))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
