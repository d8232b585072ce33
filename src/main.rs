//! gomeet-chat - Realtime chat and call-signaling client for GoMeet
//!
//! One-to-one chat, presence, and audio/video call signaling over the
//! product's managed document store and push provider.

mod calling;
mod chat;
mod config;
mod error;
mod models;
mod presence;
mod push;
mod store;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::calling::{CallCoordinator, CallSignal, CallState, SystemDevices};
use crate::chat::{room_id, ChatRooms, ConversationIndex};
use crate::config::Config;
use crate::models::{CallKind, ConversationSummary, Message, Participant};
use crate::presence::PresenceTracker;
use crate::push::{Notify, NullDispatcher, OneSignalDispatcher, PushPayload};
use crate::store::{DocumentStore, FirestoreStore, MemoryStore};

#[derive(Parser)]
#[command(name = "gomeet-chat")]
#[command(about = "Realtime chat and call-signaling client for GoMeet", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use an in-process store instead of the configured one (demo/testing)
    #[arg(long, global = true)]
    local: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Store identity and go online
    Login {
        /// Stable user id from the account system
        user_id: String,

        /// Display name shown to counterparts
        display_name: String,
    },

    /// Go offline and clear the stored identity
    Logout,

    /// Show identity and presence state
    Status,

    /// List conversations, newest first
    Chats {
        /// Keep running and reprint the list whenever it changes
        #[arg(short, long)]
        follow: bool,
    },

    /// Read the message history with a user
    Read {
        /// Counterpart user id
        peer: String,

        /// Maximum number of messages to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Send a message
    Send {
        /// Recipient user id
        #[arg(short, long)]
        to: String,

        /// Message content
        message: String,
    },

    /// Live-tail the conversation with a user
    Watch {
        /// Counterpart user id
        peer: String,
    },

    /// Show a user's presence (defaults to yourself)
    Presence {
        /// User id to look up
        peer: Option<String>,

        /// Keep running and report every transition
        #[arg(short, long)]
        watch: bool,
    },

    /// Place a call
    Call {
        /// Callee user id
        peer: String,

        /// Video call instead of voice
        #[arg(long)]
        video: bool,
    },

    /// Answer the call ringing in the room with a user
    Answer {
        /// Caller user id
        peer: String,
    },

    /// End the call in the room with a user
    Hangup {
        /// Counterpart user id
        peer: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut cfg = Config::load()?;
    let app = App::build(&cfg, cli.local)?;

    match cli.command {
        Commands::Login {
            user_id,
            display_name,
        } => {
            cfg.identity = Some(config::IdentityConfig {
                user_id: user_id.clone(),
                display_name: display_name.clone(),
            });
            cfg.save()?;
            app.presence.set_online(&user_id).await?;
            println!("Logged in as {} ({})", display_name, user_id);
        }
        Commands::Logout => {
            let me = app.me()?;
            app.presence.set_offline(&me.id).await?;
            cfg.identity = None;
            cfg.save()?;
            println!("Logged out");
        }
        Commands::Status => match app.me() {
            Ok(me) => {
                let online = app.presence.is_online(&me.id).await?;
                println!("{} ({})", me.display_name, me.id);
                println!("Presence: {}", if online { "online" } else { "offline" });
            }
            Err(_) => println!("Not logged in"),
        },
        Commands::Chats { follow } => {
            let me = app.me()?;
            if follow {
                let mut feed = app.index.watch(&me.id);
                println!("Following conversation list. Ctrl-C to stop.");
                loop {
                    tokio::select! {
                        update = feed.updates.recv() => match update {
                            Some(summaries) => print_summaries(&summaries),
                            None => break,
                        },
                        _ = tokio::signal::ctrl_c() => {
                            feed.subscription.cancel();
                            break;
                        }
                    }
                }
            } else {
                print_summaries(&app.index.summaries(&me.id).await?);
            }
        }
        Commands::Read { peer, limit } => {
            let me = app.me()?;
            let room = room_id(&me.id, &peer)?;
            let messages = app.chat.messages(&room).await?;
            let start = messages.len().saturating_sub(limit);
            for message in &messages[start..] {
                print_message(message);
            }
        }
        Commands::Send { to, message } => {
            let me = app.me()?;
            let sent = app.chat.send(&me, &to, &message).await?;

            // The message is already durable; a failed push only means the
            // recipient gets no banner.
            let payload = PushPayload::Chat {
                sender_id: me.id.clone(),
                sender_name: me.display_name.clone(),
            };
            if let Err(e) = app
                .notifier
                .notify(&to, &me.display_name, &sent.body, &payload)
                .await
            {
                tracing::warn!("push dispatch failed: {}", e);
            }
            println!("Message sent to {} at {}", to, sent.timestamp);
        }
        Commands::Watch { peer } => {
            let me = app.me()?;
            let room = room_id(&me.id, &peer)?;
            let mut feed = app.chat.subscribe(&room);
            println!("Watching conversation with {}. Ctrl-C to stop.", peer);

            loop {
                tokio::select! {
                    update = feed.updates.recv() => match update {
                        Some(messages) => {
                            println!("----- {} message(s) -----", messages.len());
                            for message in &messages {
                                print_message(message);
                            }
                        }
                        None => break,
                    },
                    _ = tokio::signal::ctrl_c() => {
                        feed.subscription.cancel();
                        break;
                    }
                }
            }
        }
        Commands::Presence { peer, watch } => {
            let subject = match peer {
                Some(peer) => peer,
                None => app.me()?.id,
            };
            if watch {
                let mut feed = app.presence.watch(&subject);
                println!("Watching presence of {}. Ctrl-C to stop.", subject);
                loop {
                    tokio::select! {
                        update = feed.updates.recv() => match update {
                            Some(online) => println!(
                                "{} is {}",
                                subject,
                                if online { "online" } else { "offline" }
                            ),
                            None => break,
                        },
                        _ = tokio::signal::ctrl_c() => {
                            feed.subscription.cancel();
                            break;
                        }
                    }
                }
            } else {
                let online = app.presence.is_online(&subject).await?;
                println!(
                    "{} is {}",
                    subject,
                    if online { "online" } else { "offline" }
                );
            }
        }
        Commands::Call { peer, video } => {
            let me = app.me()?;
            let kind = if video {
                CallKind::Video
            } else {
                CallKind::Audio
            };
            let session = app.calls.start_call(&me, &peer, kind).await?;
            let room = room_id(&me.id, &peer)?;
            println!("Calling {} ({:?})... Ctrl-C to hang up", peer, session.kind);
            attend(&app, &room, CallState::Ringing).await?;
        }
        Commands::Answer { peer } => {
            let me = app.me()?;
            let room = room_id(&me.id, &peer)?;
            match app.calls.join_call(&room).await? {
                Some(session) => {
                    println!(
                        "Joined {:?} call with {}. Ctrl-C to hang up",
                        session.kind, peer
                    );
                    attend(&app, &room, CallState::Active).await?;
                }
                None => println!("No call ringing with {}", peer),
            }
        }
        Commands::Hangup { peer } => {
            let me = app.me()?;
            let room = room_id(&me.id, &peer)?;
            match app.calls.call_state(&room).await? {
                CallState::Idle => println!("No call with {}", peer),
                _ => {
                    app.calls.end_call(&room).await?;
                    println!("Call ended");
                }
            }
        }
    }

    Ok(())
}

/// Wired-up components over one shared store.
struct App {
    me: Option<Participant>,
    chat: ChatRooms,
    index: ConversationIndex,
    presence: PresenceTracker,
    calls: CallCoordinator,
    notifier: Arc<dyn Notify>,
}

impl App {
    fn build(cfg: &Config, local: bool) -> Result<Self> {
        let store: Arc<dyn DocumentStore> = if local {
            Arc::new(MemoryStore::new())
        } else {
            let fs = cfg.firestore.as_ref().context(
                "No [firestore] section in config. Add store credentials or run with --local.",
            )?;
            Arc::new(FirestoreStore::new(&fs.project_id, &fs.api_key))
        };

        let notifier: Arc<dyn Notify> = match &cfg.onesignal {
            Some(os) => Arc::new(OneSignalDispatcher::new(&os.app_id, &os.rest_api_key)),
            None => Arc::new(NullDispatcher),
        };

        let media = match &cfg.rtc {
            Some(rtc) => calling::RtcChannel::new(&rtc.app_id, rtc.token.as_deref()),
            None => calling::RtcChannel::new("local", None),
        };

        let interval = cfg.poll_interval();
        Ok(Self {
            me: cfg.participant(),
            chat: ChatRooms::new(store.clone(), interval),
            index: ConversationIndex::new(store.clone(), interval),
            presence: PresenceTracker::new(store.clone(), interval),
            calls: CallCoordinator::new(
                store,
                notifier.clone(),
                Arc::new(media),
                Arc::new(SystemDevices),
                interval,
            ),
            notifier,
        })
    }

    fn me(&self) -> Result<Participant> {
        self.me
            .clone()
            .context("Not logged in. Run 'gomeet-chat login <user-id> <display-name>'.")
    }
}

/// Stay on the call until the signaling record goes inactive (either side may
/// flip it), then tear down unconditionally.
async fn attend(app: &App, room: &str, mut state: CallState) -> Result<()> {
    let mut feed = app.calls.watch(room);

    loop {
        tokio::select! {
            signal = feed.updates.recv() => match signal {
                Some(CallSignal::Incoming(_)) => {
                    if state == CallState::Ringing {
                        state = CallState::Active;
                        tracing::debug!("media channel attached in {}", room);
                    }
                }
                Some(CallSignal::Clear) | None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    tracing::debug!("leaving call in {} from state {:?}", room, state);
    app.calls.end_call(room).await?;
    println!("Call ended");
    Ok(())
}

fn print_summaries(summaries: &[ConversationSummary]) {
    if summaries.is_empty() {
        println!("No conversations yet");
        return;
    }
    for summary in summaries {
        println!(
            "{:<20} {}  {}",
            summary.counterpart,
            summary.last_at,
            truncate(&summary.last_body, 48)
        );
    }
}

fn print_message(message: &Message) {
    println!(
        "[{}] {}: {}",
        message.timestamp, message.sender_name, message.body
    );
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    }
}
