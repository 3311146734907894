use std::sync::Arc;

use chrono_tz::Tz;
use futures::future::join_all;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use punch_timer::client::attendance::models::AttendanceDay;
use punch_timer::client::attendance::services::HttpAttendanceApi;
use punch_timer::config::{Config, DeviceProfile};
use punch_timer::context::UserContext;
use punch_timer::error::PunchResult;
use punch_timer::logging::{AuditLog, init_tracing};
use punch_timer::timer::{
    LiveState, PunchDispatcher, PunchState, SystemClock, Ticker, format_hms,
};

enum Command {
    In {
        project: Option<String>,
        site: Option<String>,
    },
    Out {
        note: Option<String>,
    },
    Status,
    Refresh,
    Quit,
    Help,
}

fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    let command = match parts.next()? {
        "in" => Command::In {
            project: parts.next().map(str::to_string),
            site: parts.next().map(str::to_string),
        },
        "out" => {
            let note = parts.collect::<Vec<_>>().join(" ");
            Command::Out {
                note: (!note.is_empty()).then_some(note),
            }
        }
        "status" => Command::Status,
        "refresh" => Command::Refresh,
        "quit" | "exit" => Command::Quit,
        _ => Command::Help,
    };
    Some(command)
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(2);
        }
    };
    let audit = AuditLog::new(&config.log_dir);
    audit.info("Application started");

    let profile = match DeviceProfile::load_or_create(&config.device_profile_path) {
        Ok(profile) => profile,
        Err(e) => {
            audit.error(&format!(
                "Could not read device profile {}: {}",
                config.device_profile_path.display(),
                e
            ));
            std::process::exit(2);
        }
    };
    if profile.is_placeholder() {
        audit.warn(&format!(
            "Device profile {} still has placeholder IP/location",
            config.device_profile_path.display()
        ));
    }

    let context = Arc::new(UserContext::from_config(&config));
    let api = Arc::new(HttpAttendanceApi::new(config.domain_api.clone(), context.clone()));
    let clock = Arc::new(SystemClock);
    let dispatcher = Arc::new(
        PunchDispatcher::new(api, context.clone(), profile.client_meta(), clock.clone(), audit.clone())
            .with_note_required_before_schedule(config.note_required_before_schedule),
    );

    let (live_tx, mut live_rx) = watch::channel(None);
    let ticker = Ticker::spawn(dispatcher.subscribe(), clock, live_tx);

    println!("Hello {}. Commands: in [project] [site] | out [note] | status | refresh | quit", context.display_name);
    if let Err(e) = dispatcher.refresh().await {
        eprintln!("Could not load today's attendance: {}", e);
    }

    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<(&'static str, PunchResult<PunchState>)>();
    let mut pending: Vec<JoinHandle<()>> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        audit.error(&format!("stdin closed: {}", e));
                        break;
                    }
                };
                let Some(command) = parse_command(&line) else { continue };
                match command {
                    Command::In { project, site } => {
                        let project = project.or_else(|| config.default_project_id.clone()).unwrap_or_default();
                        let site = site.or_else(|| config.default_work_site_id.clone()).unwrap_or_default();
                        let dispatcher = dispatcher.clone();
                        let done_tx = done_tx.clone();
                        pending.push(tokio::spawn(async move {
                            let result = dispatcher.punch_in(&project, &site).await;
                            let _ = done_tx.send(("Punch in", result));
                        }));
                    }
                    Command::Out { note } => {
                        let dispatcher = dispatcher.clone();
                        let done_tx = done_tx.clone();
                        pending.push(tokio::spawn(async move {
                            let result = dispatcher.punch_out(note.as_deref()).await;
                            let _ = done_tx.send(("Punch out", result));
                        }));
                    }
                    Command::Status => {
                        print_status(dispatcher.snapshot().as_ref(), live_rx.borrow().as_ref(), config.timezone);
                    }
                    Command::Refresh => {
                        let dispatcher = dispatcher.clone();
                        let done_tx = done_tx.clone();
                        pending.push(tokio::spawn(async move {
                            let result = dispatcher.refresh().await.map(|_| dispatcher.state());
                            let _ = done_tx.send(("Refresh", result));
                        }));
                    }
                    Command::Quit => break,
                    Command::Help => {
                        println!("Commands: in [project] [site] | out [note] | status | refresh | quit");
                    }
                }
                pending.retain(|handle| !handle.is_finished());
            }
            Some((action, result)) = done_rx.recv() => {
                match result {
                    Ok(state) => println!("{} confirmed, now {}", action, describe(&state)),
                    Err(e) => eprintln!("{} failed: {}", action, e),
                }
            }
            changed = live_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(state) = live_rx.borrow_and_update().as_ref() {
                    if state.is_checked_in() {
                        println!("{}", live_line(state));
                    }
                }
            }
        }
    }

    // submissions are never cancelled mid-flight
    join_all(pending).await;
    drop(ticker);
    audit.info("Application stopped");
}

fn describe(state: &PunchState) -> String {
    match state {
        PunchState::CheckedOut => "checked out".to_string(),
        PunchState::CheckedIn { record_id } => format!("checked in (record {})", record_id),
    }
}

fn live_line(state: &LiveState) -> String {
    let metrics = &state.metrics;
    let balance = if metrics.overtime.is_zero() {
        format!("remaining {}", format_hms(metrics.remaining))
    } else {
        format!("overtime {}", format_hms(metrics.overtime))
    };
    let checkout = match state.checkout_unlocks_in() {
        Some(wait) => format!("checkout in {}s", (wait.num_milliseconds() + 999) / 1000),
        None => "checkout ready".to_string(),
    };
    format!(
        "session {} | total {} | {} | {}",
        format_hms(metrics.elapsed_in_session),
        format_hms(metrics.live_total),
        balance,
        checkout
    )
}

fn print_status(day: Option<&AttendanceDay>, live: Option<&LiveState>, tz: Tz) {
    let (Some(day), Some(live)) = (day, live) else {
        println!("No attendance loaded yet");
        return;
    };

    println!(
        "Schedule {} | {}",
        format_hms(live.metrics.schedule),
        describe(&PunchState::of(Some(day)))
    );
    for record in &day.punch_records {
        let punch_in = record.punch_in.with_timezone(&tz).format("%H:%M:%S");
        let punch_out = record
            .punch_out
            .map(|t| t.with_timezone(&tz).format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "open".to_string());
        println!(
            "  {} {} -> {} {}",
            record.id,
            punch_in,
            punch_out,
            record.project_id.as_deref().unwrap_or("-")
        );
    }
    println!("{}", live_line(live));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert!(matches!(
            parse_command("in p-1 hq"),
            Some(Command::In { project: Some(p), site: Some(s) }) if p == "p-1" && s == "hq"
        ));
        assert!(matches!(
            parse_command("in"),
            Some(Command::In { project: None, site: None })
        ));
        assert!(matches!(
            parse_command("out left  early today"),
            Some(Command::Out { note: Some(n) }) if n == "left early today"
        ));
        assert!(matches!(parse_command("out"), Some(Command::Out { note: None })));
        assert!(matches!(parse_command("quit"), Some(Command::Quit)));
        assert!(matches!(parse_command("dance"), Some(Command::Help)));
        assert!(parse_command("   ").is_none());
    }
}
