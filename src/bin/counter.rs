//! Counter demo
//!
//! Reads commands from stdin (`inc`, `dec`, `reset`, `pause`, `resume`,
//! `quit`) and prints every model as a JSON line. Reaching the limit
//! schedules an automatic reset.

use loop_runtime::connectable::{FnConnectable, SimpleConnection};
use loop_runtime::effect::EffectRouter;
use loop_runtime::event_source::StreamEventSource;
use loop_runtime::runtime::loop_builder;
use loop_runtime::state_machine::{Next, TracingLogger};
use loop_runtime::{Consumer, RuntimeConfig};
use serde::Serialize;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const LIMIT: i64 = 10;
const AUTO_RESET_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Default, Serialize)]
struct Counter {
    value: i64,
    auto_resets: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Event {
    Increment,
    Decrement,
    Reset,
    AutoReset,
}

#[derive(Debug, Clone, PartialEq)]
enum Effect {
    ScheduleReset(Duration),
}

fn update(model: &Counter, event: &Event) -> Next<Counter, Effect> {
    match event {
        Event::Increment => {
            let next = Counter {
                value: model.value + 1,
                ..model.clone()
            };
            if next.value == LIMIT {
                Next::next_with(next, [Effect::ScheduleReset(AUTO_RESET_DELAY)])
            } else {
                Next::next(next)
            }
        }
        Event::Decrement => Next::next(Counter {
            value: model.value - 1,
            ..model.clone()
        }),
        Event::Reset if model.value == 0 => Next::no_change(),
        Event::Reset => Next::next(Counter {
            value: 0,
            ..model.clone()
        }),
        // Only fires if nobody moved the counter off the limit meanwhile
        Event::AutoReset if model.value >= LIMIT => Next::next(Counter {
            value: 0,
            auto_resets: model.auto_resets + 1,
        }),
        Event::AutoReset => Next::no_change(),
    }
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim() {
        "inc" | "+" => Some(Command::Event(Event::Increment)),
        "dec" | "-" => Some(Command::Event(Event::Decrement)),
        "reset" => Some(Command::Event(Event::Reset)),
        "pause" => Some(Command::Pause),
        "resume" => Some(Command::Resume),
        "quit" | "exit" => Some(Command::Quit),
        _ => None,
    }
}

enum Command {
    Event(Event),
    Pause,
    Resume,
    Quit,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loop_runtime=info,counter=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = RuntimeConfig::from_env();
    tracing::info!(
        processing = ?config.processing,
        notification = ?config.notification,
        error_policy = ?config.error_policy,
        "Runtime configured"
    );

    let runtime = tokio::runtime::Handle::current();
    let effects = EffectRouter::new()
        .with_error_hook(config.error_hook())
        .route_effects(|effect: &Effect| match effect {
            Effect::ScheduleReset(delay) => Some(*delay),
        })
        .to_async(runtime.clone(), |delay| async move {
            tokio::time::sleep(delay).await;
            [Event::AutoReset]
        })
        .as_connectable();

    let (commands, _) = broadcast::channel(64);
    let controller = loop_builder(update, effects)
        .with_config(&config)
        .with_logger(TracingLogger::new("counter"))
        .with_event_source(StreamEventSource::from_broadcast(runtime, commands.clone()))
        .controller(Counter::default());

    let view = FnConnectable::new(|_events: Consumer<Event>| {
        SimpleConnection::new(
            |model: Counter| match serde_json::to_string(&model) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "Failed to encode model"),
            },
            || tracing::debug!("View disconnected"),
        )
    })
    .with_error_hook(config.error_hook());
    controller.connect_view(view)?;
    controller.start()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Some(Command::Event(event)) => {
                if commands.send(event).is_err() {
                    tracing::info!(?event, "Paused, command ignored");
                }
            }
            Some(Command::Pause) => {
                if let Err(e) = controller.stop() {
                    tracing::warn!(error = %e, "Cannot pause");
                }
            }
            Some(Command::Resume) => {
                if let Err(e) = controller.start() {
                    tracing::warn!(error = %e, "Cannot resume");
                }
            }
            Some(Command::Quit) => break,
            None => tracing::warn!(command = %line.trim(), "Unknown command"),
        }
    }

    if controller.is_running() {
        controller.stop()?;
    }
    tracing::info!(model = ?controller.model(), "Counter stopped");
    Ok(())
}
