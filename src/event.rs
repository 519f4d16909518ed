// event.rs
use std::{
    sync::mpsc::{self, Receiver, Sender},
    thread,
    time::{Duration, Instant},
};

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};

use crate::app::LoadedDocument;
use crate::convert::ConvertError;

pub enum Event {
    Tick,
    Input(KeyEvent),
    Resize,
    /// A load worker finished. `generation` identifies the request; stale
    /// generations are discarded by the receiver.
    LoadComplete {
        generation: u64,
        name: String,
        result: Result<LoadedDocument, ConvertError>,
    },
}

pub struct EventHandler {
    sender: Sender<Event>,
    receiver: Receiver<Event>,
    #[allow(dead_code)]
    event_thread: thread::JoinHandle<()>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> EventHandler {
        let (sender, receiver) = mpsc::channel();
        let input_sender = sender.clone();
        let event_thread = thread::spawn(move || {
            let mut last_tick = Instant::now();
            loop {
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or_else(|| Duration::from_secs(0));

                // Poll for a crossterm event.
                if event::poll(timeout).expect("Unable to poll for events") {
                    let forwarded = match event::read().expect("Unable to read event") {
                        CrosstermEvent::Key(e) => input_sender.send(Event::Input(e)),
                        CrosstermEvent::Resize(_, _) => input_sender.send(Event::Resize),
                        _ => Ok(()),
                    };
                    // The receiver is gone once the app shuts down.
                    if forwarded.is_err() {
                        break;
                    }
                }

                // If enough time has passed, send a `Tick` event.
                if last_tick.elapsed() >= tick_rate {
                    if input_sender.send(Event::Tick).is_err() {
                        break;
                    }
                    last_tick = Instant::now();
                }
            }
        });
        EventHandler {
            sender,
            receiver,
            event_thread,
        }
    }

    /// Channel end handed to load workers so completions arrive in the same
    /// queue as input events.
    pub fn sender(&self) -> Sender<Event> {
        self.sender.clone()
    }

    pub fn next(&self) -> Result<Event, mpsc::RecvError> {
        self.receiver.recv()
    }
}
