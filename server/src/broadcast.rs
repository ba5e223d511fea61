//! Outbound fan-out to the channels attached to a lobby.
//!
//! Every message is serialized once and pushed to each open channel. There is
//! no acknowledgement and no retry. A channel whose socket task has already
//! gone away, or whose queue is full, is skipped.

use log::{debug, error};
use shared::{PlayerId, ServerMessage};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Frames a slow socket may have queued before further ones are dropped.
pub const OUTBOUND_QUEUE: usize = 64;

/// Outbound half of a player's real-time channel.
///
/// The socket writer task owns the receiving end and exits once every sender
/// is dropped, so dropping a `Connection` closes the channel.
#[derive(Debug, Clone)]
pub struct Connection {
    pub player_id: PlayerId,
    sender: mpsc::Sender<String>,
}

impl Connection {
    pub fn new(player_id: PlayerId, sender: mpsc::Sender<String>) -> Self {
        Self { player_id, sender }
    }

    /// True while the socket writer is still consuming messages.
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Queues already-serialized text. Returns false if the channel was skipped.
    ///
    /// Never waits: a full queue drops the frame, since a newer snapshot
    /// follows on the next tick anyway.
    pub fn send_text(&self, text: &str) -> bool {
        match self.sender.try_send(text.to_string()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("Outbound queue of player {} is full, dropping frame", self.player_id);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    pub fn send(&self, message: &ServerMessage) -> bool {
        match message.encode() {
            Ok(text) => self.send_text(&text),
            Err(e) => {
                error!("Failed to serialize message for {}: {}", self.player_id, e);
                false
            }
        }
    }
}

/// Sends the same message to every open connection and returns how many
/// channels it was queued on.
pub fn fan_out<'a, I>(connections: I, message: &ServerMessage) -> usize
where
    I: IntoIterator<Item = &'a Connection>,
{
    let text = match message.encode() {
        Ok(text) => text,
        Err(e) => {
            error!("Failed to serialize broadcast: {}", e);
            return 0;
        }
    };

    let mut delivered = 0;
    for connection in connections {
        if connection.send_text(&text) {
            delivered += 1;
        } else {
            debug!("Skipping channel of player {}", connection.player_id);
        }
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_connection(id: &str) -> (Connection, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE);
        (Connection::new(id.to_string(), tx), rx)
    }

    #[test]
    fn test_fan_out_reaches_every_open_channel() {
        let (a, mut rx_a) = open_connection("a");
        let (b, mut rx_b) = open_connection("b");

        let message = ServerMessage::PlayerJoined {
            player_name: "Carol".into(),
        };
        let delivered = fan_out([&a, &b], &message);

        assert_eq!(delivered, 2);
        let text_a = rx_a.try_recv().unwrap();
        let text_b = rx_b.try_recv().unwrap();
        assert_eq!(text_a, text_b);
        assert!(text_a.contains("PLAYER_JOINED"));
    }

    #[test]
    fn test_fan_out_skips_closed_channels() {
        let (a, mut rx_a) = open_connection("a");
        let (b, rx_b) = open_connection("b");
        drop(rx_b);

        assert!(a.is_open());
        assert!(!b.is_open());

        let delivered = fan_out([&a, &b], &ServerMessage::GameStart { start_time: 1 });

        assert_eq!(delivered, 1);
        assert!(rx_a.try_recv().is_ok());
    }

    #[test]
    fn test_send_to_single_connection() {
        let (a, mut rx_a) = open_connection("a");
        assert!(a.send(&ServerMessage::GameOver {
            winner: "Alice".into()
        }));
        let text = rx_a.try_recv().unwrap();
        let decoded: ServerMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(
            decoded,
            ServerMessage::GameOver {
                winner: "Alice".into()
            }
        );
    }

    #[test]
    fn test_full_queue_drops_frames_without_blocking_others() {
        let (slow_tx, mut slow_rx) = mpsc::channel(2);
        let slow = Connection::new("slow".into(), slow_tx);
        let (fast, mut fast_rx) = open_connection("fast");

        for start_time in 0..5 {
            fan_out([&slow, &fast], &ServerMessage::GameStart { start_time });
        }

        // The slow channel kept its first two frames and is still open.
        assert!(slow.is_open());
        let mut slow_frames = 0;
        while slow_rx.try_recv().is_ok() {
            slow_frames += 1;
        }
        assert_eq!(slow_frames, 2);

        let mut fast_frames = 0;
        while fast_rx.try_recv().is_ok() {
            fast_frames += 1;
        }
        assert_eq!(fast_frames, 5);

        // Once drained, the slow channel accepts frames again.
        assert_eq!(fan_out([&slow], &ServerMessage::GameStart { start_time: 9 }), 1);
    }
}
