//! Interactive line-mode loop shared by `connect` and `play`.
//!
//! Stdin lines go to the active session; lines starting with `/` are client
//! commands. Text from the active session is written to stdout as it
//! arrives. Activity on other sessions is announced on stderr by an event
//! bus subscriber, once per session until it is switched to.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use mudlink_client::{default_log_path, SessionConnection, SessionRegistry};
use mudlink_core::{BusEvent, ConnectionState, SessionId};

const HELP: &str = "\
/list            list sessions
/switch <n>      make session <n> active
/log [path]      log the active session (default: logs directory)
/nolog           stop logging
/dc              disconnect the active session
/connect         reconnect the active session
/quit            disconnect everything and exit
//text           send a line starting with '/'";

/// Which session is in front, and which others have unseen activity.
#[derive(Debug, Default)]
struct Watch {
    active: Option<SessionId>,
    unread: HashSet<SessionId>,
}

fn announce(watch: &Mutex<Watch>, event: &BusEvent) {
    let BusEvent::NewMessage(msg) = event else {
        return;
    };
    let mut watch = watch.lock().unwrap_or_else(|p| p.into_inner());
    if watch.active.as_ref() == Some(&msg.session_id) {
        return;
    }
    if watch.unread.insert(msg.session_id.clone()) {
        eprintln!("[{}] new activity", msg.session_label);
    }
}

enum Flow {
    Continue,
    Quit,
}

/// Console state that lives outside the registry.
struct Console<'a> {
    logs_dir: &'a Path,
    watch: Arc<Mutex<Watch>>,
    /// Bytes already written to stdout, per session.
    printed: HashMap<SessionId, u64>,
    /// Last announced state, per session.
    states: HashMap<SessionId, ConnectionState>,
}

pub async fn run(mut registry: SessionRegistry, logs_dir: &Path) -> Result<()> {
    let watch = Arc::new(Mutex::new(Watch::default()));
    let subscription = registry.bus().subscribe(Box::new({
        let watch = Arc::clone(&watch);
        move |event: &BusEvent| announce(&watch, event)
    }));

    let mut console = Console {
        logs_dir,
        watch,
        printed: HashMap::new(),
        states: HashMap::new(),
    };
    console.focus(&registry);
    eprintln!("Type /help for client commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            changed = registry.next_dispatch() => {
                let Some(id) = changed else { break };
                console.refresh(&registry, &id)?;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    debug!("stdin closed");
                    break;
                };
                if let Flow::Quit = console.input(&mut registry, &line).await? {
                    break;
                }
                console.focus(&registry);
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!();
                break;
            }
        }
    }

    registry.bus().unsubscribe(subscription);
    registry.shutdown();
    Ok(())
}

impl Console<'_> {
    /// Publish the active session to the subscriber and print its backlog.
    fn focus(&mut self, registry: &SessionRegistry) {
        let active = registry.active().map(|s| s.id().clone());
        {
            let mut watch = self.watch.lock().unwrap_or_else(|p| p.into_inner());
            if let Some(id) = &active {
                watch.unread.remove(id);
            }
            watch.active = active;
        }
        if let Some(session) = registry.active() {
            if let Err(e) = self.print_unseen(session) {
                debug!(error = %e, "stdout write failed");
            }
        }
    }

    fn refresh(&mut self, registry: &SessionRegistry, id: &SessionId) -> Result<()> {
        let Some(session) = registry.session(id) else {
            return Ok(());
        };

        let state = session.state();
        if self.states.insert(id.clone(), state) != Some(state) {
            eprintln!("[{}] {state}", session.display_label());
        }

        if registry.active().is_some_and(|a| a.id() == id) {
            self.print_unseen(session)?;
        }
        Ok(())
    }

    fn print_unseen(&mut self, session: &SessionConnection) -> Result<()> {
        let seen = self.printed.entry(session.id().clone()).or_insert(0);
        let unseen = session.bytes_received().saturating_sub(*seen);
        if unseen == 0 {
            return Ok(());
        }
        *seen = session.bytes_received();

        // If scrollback was trimmed past what we printed, this is all of it.
        let text = session.output().tail(unseen as usize);
        let mut out = std::io::stdout().lock();
        out.write_all(text.as_bytes())?;
        out.flush()?;
        Ok(())
    }

    async fn input(&mut self, registry: &mut SessionRegistry, line: &str) -> Result<Flow> {
        let command = match line.strip_prefix('/') {
            Some(rest) if !rest.starts_with('/') => rest.trim(),
            Some(rest) => return Ok(self.send(registry, rest)),
            None => return Ok(self.send(registry, line)),
        };

        let (verb, arg) = match command.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (command, ""),
        };

        match verb {
            "help" | "?" => eprintln!("{HELP}"),
            "list" => list(registry),
            "switch" => {
                let target = arg
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| registry.sessions().get(i))
                    .map(|s| s.id().clone());
                match target {
                    Some(id) => {
                        registry.set_active(&id);
                    }
                    None => eprintln!("usage: /switch <n> (see /list)"),
                }
            }
            "log" => {
                let Some(session) = registry.active_mut() else {
                    eprintln!("no active session");
                    return Ok(Flow::Continue);
                };
                let path = if arg.is_empty() {
                    default_log_path(self.logs_dir, &session.display_label())
                } else {
                    arg.into()
                };
                match session.start_logging(path) {
                    Ok(path) => eprintln!("logging to {}", path.display()),
                    Err(e) => eprintln!("cannot start log: {e}"),
                }
            }
            "nolog" => match registry.active_mut().and_then(|s| s.stop_logging()) {
                Some(log) => {
                    let path = log.path().to_path_buf();
                    log.finish().await;
                    eprintln!("log closed: {}", path.display());
                }
                None => eprintln!("not logging"),
            },
            "dc" => match registry.active_mut() {
                Some(session) => session.disconnect(),
                None => eprintln!("no active session"),
            },
            "connect" => match registry.active_mut() {
                Some(session) if session.state() == ConnectionState::Disconnected => {
                    session.connect();
                }
                Some(session) => eprintln!("[{}] already {}", session.display_label(), session.state()),
                None => eprintln!("no active session"),
            },
            "quit" | "q" => return Ok(Flow::Quit),
            other => eprintln!("unknown command /{other} (try /help)"),
        }
        Ok(Flow::Continue)
    }

    fn send(&mut self, registry: &mut SessionRegistry, text: &str) -> Flow {
        match registry.active_mut() {
            Some(session) => {
                if !session.send_command(text) {
                    eprintln!("[{}] not connected (/connect to retry)", session.display_label());
                }
            }
            None => eprintln!("no active session"),
        }
        Flow::Continue
    }
}

fn list(registry: &SessionRegistry) {
    if registry.sessions().is_empty() {
        eprintln!("no sessions");
        return;
    }
    let active = registry.active().map(|s| s.id().clone());
    for (i, session) in registry.sessions().iter().enumerate() {
        let marker = if active.as_ref() == Some(session.id()) { '*' } else { ' ' };
        let transport = session
            .transport_kind()
            .map(|k| format!(" via {k}"))
            .unwrap_or_default();
        let logging = session
            .log_path()
            .map(|p| format!(" logging to {}", p.display()))
            .unwrap_or_default();
        eprintln!(
            "{marker}{:>2}. {} [{}{transport}]{logging}",
            i + 1,
            session.display_label(),
            session.state()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mudlink_core::MessageEvent;

    fn message(session: &str) -> BusEvent {
        BusEvent::NewMessage(MessageEvent {
            session_label: format!("{session}@World"),
            session_id: SessionId::from(session),
            message: "hi\n".into(),
        })
    }

    #[test]
    fn announces_background_sessions_once() {
        let watch = Mutex::new(Watch {
            active: Some(SessionId::from("front")),
            unread: HashSet::new(),
        });

        announce(&watch, &message("front"));
        assert!(watch.lock().unwrap().unread.is_empty());

        announce(&watch, &message("back"));
        announce(&watch, &message("back"));
        assert_eq!(watch.lock().unwrap().unread.len(), 1);
    }
}
