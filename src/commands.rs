//! Command implementations for the blescan CLI
//!
//! Each command drives the discovery screen the way a user would: press the
//! button, watch the list grow, press again to stop.

use std::future;
use std::time::Duration;

use log::{debug, info};

use blescan::ui::cli::render;
use blescan::Result;

use crate::app_state::ScannerApp;

/// Press the scan button and keep redrawing until the scan ends
pub async fn run_scan(app: &ScannerApp, duration: Option<Duration>, json: bool) -> Result<()> {
    app.wait_for_adapter().await;

    let screen = app.screen();
    let session = screen.session();
    let mut revisions = session.subscribe();

    if let Err(e) = screen.press().await {
        // The alert has already been shown to the user
        debug!("Scan did not start: {}", e);
        return Ok(());
    }
    if !json {
        render(&screen.render());
    }

    let deadline = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => future::pending().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => {
                info!("Scan duration elapsed");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                if !json {
                    render(&screen.render());
                }
                if !session.is_scanning() {
                    break;
                }
            }
        }
    }

    if session.is_scanning() {
        screen.press().await?;
    }

    let devices = session.snapshot();
    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
    } else {
        render(&screen.render());
        println!("\n{} device(s) found", devices.len());
    }

    Ok(())
}

/// Enter toggles the button, `q` quits
pub async fn run_interactive(app: &ScannerApp) -> Result<()> {
    app.wait_for_adapter().await;

    let screen = app.screen();
    let mut revisions = screen.session().subscribe();
    let mut states = app.monitor().watch();

    println!("Press Enter to toggle the scan button, `q` then Enter to quit.");
    render(&screen.render());

    loop {
        tokio::select! {
            line = app.input().next_line() => {
                match line {
                    None => break,
                    Some(line) if line.trim().eq_ignore_ascii_case("q") => break,
                    Some(_) => {
                        if let Err(e) = screen.press().await {
                            debug!("Button press failed: {}", e);
                        }
                        render(&screen.render());
                    }
                }
            }
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                render(&screen.render());
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                render(&screen.render());
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

/// Print every adapter state transition until Ctrl-C
pub async fn run_state(app: &ScannerApp) -> Result<()> {
    let mut states = app.monitor().watch();
    println!("Bluetooth: {}", *states.borrow_and_update());

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("Bluetooth: {}", *states.borrow_and_update());
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}
