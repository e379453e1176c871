//! `booking-realtime` watcher.
//!
//! Connects every channel, joins the configured user's rooms and logs each
//! pushed event until Ctrl-C.

use std::sync::Arc;

use booking_realtime::adapters::WebSocketTransport;
use booking_realtime::application::{RealtimeSockets, Subscription};
use booking_realtime::config::AppConfig;
use booking_realtime::domain::realtime::{Channel, SocketEvent};
use booking_realtime::telemetry;

fn log_event(channel: Channel) -> impl Fn(&SocketEvent) + Send + Sync + 'static {
    move |event| {
        tracing::info!(
            channel = %channel,
            event = %event.event,
            payload = %event.payload,
            "Event received"
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = AppConfig::load()?;
    config.validate()?;
    telemetry::init_tracing(&config.logging)?;

    tracing::info!(url = %config.socket.url, "Starting booking-realtime watcher");

    let sockets = RealtimeSockets::new(Arc::new(WebSocketTransport::new()), &config.socket);
    let handles = sockets.initialize_sockets();
    tracing::info!(
        client_id = %sockets.client_id(),
        state = %handles.state(),
        "Sockets initialized"
    );

    for channel in Channel::ALL {
        if let Some(handle) = handles.get(channel) {
            if let Err(error) = handle.ready(config.socket.connect_timeout()).await {
                tracing::warn!(
                    channel = %channel,
                    error = %error,
                    "Channel not open yet, will keep retrying"
                );
            }
        }
    }

    if let Some(user) = config.socket.user_id {
        sockets.bookings().join_user_booking_room(user);
        sockets.notifications().join_notification_room(user);
    }
    sockets.field_availability().join_field_availability_room(None);

    let fields = sockets.field_availability();
    let bookings = sockets.bookings();
    let notifications = sockets.notifications();
    let subscriptions: Vec<Subscription> = vec![
        fields.subscribe_to_field_availability(log_event(Channel::Fields)),
        fields.subscribe_to_field_availability_changes(log_event(Channel::Fields)),
        bookings.subscribe_to_new_bookings(log_event(Channel::Root)),
        bookings.subscribe_to_booking_updates(log_event(Channel::Root)),
        bookings.subscribe_to_booking_cancellations(log_event(Channel::Root)),
        notifications.subscribe_to_notifications(log_event(Channel::Notifications)),
        notifications.subscribe_to_notification_updates(log_event(Channel::Notifications)),
    ];
    let active = subscriptions.iter().filter(|s| s.is_active()).count();
    tracing::info!(active, total = subscriptions.len(), "Listening for events");

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down");
    drop(subscriptions);
    sockets.shutdown();
    Ok(())
}
