//! Message rendering and delivery sinks

use crate::error::Result;
use crate::negotiation::TradeEvent;
use crate::ports::NotificationSink;
use crate::types::{ActorHandle, ActorId};

/// Render the message `recipient` sees for `event`
///
/// `name_of` turns ids into display names.
pub fn render(event: &TradeEvent, recipient: &ActorId, name_of: impl Fn(&ActorId) -> String) -> String {
    match event {
        TradeEvent::NewOffer {
            initiator,
            target,
            timeout,
        } => {
            let secs = timeout.as_secs();
            if recipient == initiator {
                format!(
                    "Trade request sent to {}. Use 'cancel {}' to withdraw it. It expires in {} seconds.",
                    name_of(target),
                    name_of(target),
                    secs
                )
            } else {
                let from = name_of(initiator);
                format!(
                    "{from} wants to trade with you. Use 'accept {from}' or 'deny {from}'. It expires in {secs} seconds."
                )
            }
        }
        TradeEvent::Accepted {
            initiator, target, ..
        } => {
            if recipient == initiator {
                format!("{} accepted your trade request.", name_of(target))
            } else {
                format!("You accepted the trade request from {}.", name_of(initiator))
            }
        }
        TradeEvent::Denied { initiator, target } => {
            if recipient == initiator {
                format!("{} denied your trade request.", name_of(target))
            } else {
                format!("You denied the trade request from {}.", name_of(initiator))
            }
        }
        TradeEvent::Cancelled { initiator, target } => {
            if recipient == initiator {
                format!("You cancelled your trade request to {}.", name_of(target))
            } else {
                format!("{} cancelled their trade request.", name_of(initiator))
            }
        }
        TradeEvent::Expired { initiator, target } => {
            if recipient == initiator {
                format!("Your trade request to {} timed out.", name_of(target))
            } else {
                format!("The trade request from {} timed out.", name_of(initiator))
            }
        }
        TradeEvent::Invalidated {
            initiator,
            target,
            departed,
        } => {
            let other = if recipient == initiator { target } else { initiator };
            format!(
                "Your trade request with {} was dropped because {} left.",
                name_of(other),
                name_of(departed)
            )
        }
        TradeEvent::Ambiguous {
            action, candidates, ..
        } => {
            let names: Vec<String> = candidates.iter().map(&name_of).collect();
            format!(
                "You have several pending trade requests. Use '{} <player>' with one of: {}",
                action.command(),
                names.join(" ")
            )
        }
        TradeEvent::OnCooldown { remaining, .. } => format!(
            "You must wait {} seconds before sending another trade request.",
            remaining.as_secs().max(1)
        ),
        TradeEvent::NoOffers { .. } => "You have no pending trade requests.".to_string(),
        TradeEvent::NoSuchOffer { .. } => {
            "You have no pending trade request with that player.".to_string()
        }
        TradeEvent::SelfTrade { .. } => "You cannot trade with yourself.".to_string(),
        TradeEvent::DuplicateOffer { .. } => {
            "You already have a pending trade request to that player.".to_string()
        }
        TradeEvent::ActorUnavailable { missing, .. } => {
            format!("{} is not online.", name_of(missing))
        }
    }
}

/// Prints messages to stdout, one line per delivery
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl NotificationSink for StdoutSink {
    fn deliver(&self, recipient: &ActorHandle, message: &str) -> Result<()> {
        println!("[to {}] {}", recipient, message);
        Ok(())
    }
}

/// Writes messages to the log instead of a player
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn deliver(&self, recipient: &ActorHandle, message: &str) -> Result<()> {
        tracing::debug!(target: "tradeoffer::notify", "to {}: {}", recipient, message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiation::TradeAction;
    use std::time::Duration;

    fn id(name: &str) -> ActorId {
        ActorId::from(name)
    }

    fn name(id: &ActorId) -> String {
        id.as_str().to_uppercase()
    }

    #[test]
    fn test_new_offer_differs_per_side() {
        let event = TradeEvent::NewOffer {
            initiator: id("alex"),
            target: id("steve"),
            timeout: Duration::from_secs(60),
        };

        let to_sender = render(&event, &id("alex"), name);
        let to_receiver = render(&event, &id("steve"), name);

        assert_eq!(
            to_sender,
            "Trade request sent to STEVE. Use 'cancel STEVE' to withdraw it. It expires in 60 seconds."
        );
        assert!(to_receiver.starts_with("ALEX wants to trade with you."));
        assert!(to_receiver.contains("'accept ALEX'"));
    }

    #[test]
    fn test_ambiguous_lists_candidates_with_command() {
        let event = TradeEvent::Ambiguous {
            actor: id("t"),
            action: TradeAction::Deny,
            candidates: vec![id("a"), id("b")],
        };

        assert_eq!(
            render(&event, &id("t"), name),
            "You have several pending trade requests. Use 'deny <player>' with one of: A B"
        );
    }

    #[test]
    fn test_invalidated_names_departed_player() {
        let event = TradeEvent::Invalidated {
            initiator: id("a"),
            target: id("b"),
            departed: id("b"),
        };

        assert_eq!(
            render(&event, &id("a"), name),
            "Your trade request with B was dropped because B left."
        );
    }

    #[test]
    fn test_cooldown_message() {
        let event = TradeEvent::OnCooldown {
            actor: id("a"),
            remaining: Duration::from_secs(42),
        };
        assert!(render(&event, &id("a"), name).contains("42 seconds"));
    }

    #[test]
    fn test_sinks_accept_delivery() {
        let handle = ActorHandle::new(id("a"), "Alex");
        assert!(StdoutSink.deliver(&handle, "hello").is_ok());
        assert!(LogSink.deliver(&handle, "hello").is_ok());
    }
}
