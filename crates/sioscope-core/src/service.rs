//! Service layer: turns UI intents into transport commands.

use crate::payload::{Bus, Notice, Payload};
use crate::topics;
use crate::transport::TransportCommand;
use sioscope_proto::Subscription;
use std::rc::{Rc, Weak};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

/// Subscriptions bridging `ui:*` topics to a transport.
#[derive(Debug)]
pub struct ServiceLayer {
    subscriptions: Vec<Subscription>,
}

impl ServiceLayer {
    /// Subscribes to `ui:sendMessage`, `ui:restartSio` and
    /// `ui:restartConnection`, forwarding each to `commands`.
    pub fn attach(bus: &Rc<Bus>, commands: UnboundedSender<TransportCommand>) -> Self {
        let mut subscriptions = Vec::new();

        let weak = Rc::downgrade(bus);
        let tx = commands.clone();
        subscriptions.push(bus.subscribe(topics::SEND_MESSAGE, move |payload: &Payload| {
            let Payload::Outbound(value) = payload else {
                return Err("ui:sendMessage expects an outbound payload".into());
            };
            if tx.send(TransportCommand::Send(value.clone())).is_err() {
                warn!("Transport is gone, dropping send");
                notify(&weak, Notice::error("send failed: transport unavailable"));
            }
            Ok(())
        }));

        for topic in [topics::RESTART_SIO, topics::RESTART_CONNECTION] {
            let weak = Rc::downgrade(bus);
            let tx = commands.clone();
            subscriptions.push(bus.subscribe(topic, move |_: &Payload| {
                info!(topic, "Restart requested");
                if tx.send(TransportCommand::Restart).is_err() {
                    notify(&weak, Notice::error("restart failed: transport unavailable"));
                } else {
                    notify(&weak, Notice::info("Restarting connection..."));
                }
                Ok(())
            }));
        }

        Self { subscriptions }
    }

    /// Removes every subscription this layer installed.
    pub fn detach(&mut self) {
        for subscription in &mut self.subscriptions {
            subscription.unsubscribe();
        }
    }
}

fn notify(bus: &Weak<Bus>, notice: Notice) {
    if let Some(bus) = bus.upgrade() {
        bus.publish(topics::NOTICE, &Payload::Notice(notice));
    }
}
