//! DroneOps operator CLI.
//!
//! `dashboard` is the operations-center poller: it re-fetches the fleet
//! picture on a fixed interval and each cycle's output replaces the
//! previous snapshot.

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use droneops_client::alerts::AlertFeed;
use droneops_client::{config::Config, Client};
use droneops_core::{MaintenanceStatus, OperationStatus, Pilot};
use tokio::time::{interval, Duration};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "DroneOps operations-center client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and persist the session
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Clear the session (and sign out remotely when enabled)
    Logout,
    /// Show the signed-in profile
    Whoami,
    /// Register a new pilot account
    Register {
        email: String,
        full_name: String,
        #[arg(long)]
        password: String,
    },
    /// Rotate the signed-in pilot's password
    Passwd {
        #[arg(long)]
        password: String,
    },
    /// Acknowledge a conflict notification
    Ack { id: String },
    /// Probe the remote backend schema
    Doctor,
    /// Print the manufacturer/model catalog
    Catalog,
    /// Poll fleet status on a fixed interval and render snapshots
    Dashboard {
        #[arg(long, default_value_t = 30)]
        interval_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let client = Client::connect(&config).await?;

    match cli.command {
        Command::Login { email, password } => {
            let pilot = client.auth.login(&email, &password).await?;
            println!("Signed in as {} <{}>", pilot.full_name, pilot.email);
            if pilot.change_password_required {
                println!("Note: a password change is required before flight operations.");
            }
        }
        Command::Logout => {
            client.auth.logout().await?;
            println!("Signed out.");
        }
        Command::Whoami => {
            let pilot = client.auth.me().await?;
            println!("{} <{}>", pilot.full_name, pilot.email);
            println!("id: {}", pilot.id);
            println!("role: {:?}", pilot.role);
        }
        Command::Register {
            email,
            full_name,
            password,
        } => {
            let draft = Pilot {
                email,
                full_name,
                ..Pilot::default()
            };
            let account = client.auth.create_account(draft, &password).await?;
            println!("Account created: {} <{}>", account.full_name, account.email);
        }
        Command::Passwd { password } => {
            let me = client.auth.me().await?;
            client.auth.change_password(&me.id, &password).await?;
            println!("Password updated.");
        }
        Command::Ack { id } => {
            let me = client.auth.me().await?;
            let feed = client.alerts_for(me.id);
            feed.retrieve().await;
            feed.acknowledge(&id).await?;
            println!("Acknowledged {id}.");
        }
        Command::Doctor => {
            for check in client.system.diagnose().await {
                println!("[{:?}] {}: {}", check.status, check.check, check.message);
            }
        }
        Command::Catalog => {
            for (brand, models) in client.system.catalog().await {
                println!("{brand}: {}", models.join(", "));
            }
        }
        Command::Dashboard { interval_secs } => {
            run_dashboard(&client, interval_secs).await?;
        }
    }

    Ok(())
}

async fn run_dashboard(client: &Client, interval_secs: u64) -> Result<()> {
    let me = client.auth.me().await?;
    println!(
        "Polling as {} every {}s, Ctrl-C to stop.",
        me.email,
        interval_secs.max(5)
    );
    let feed = client.alerts_for(me.id.clone());

    let mut ticker = interval(Duration::from_secs(interval_secs.max(5)));
    loop {
        ticker.tick().await;
        render_snapshot(client, &feed).await;
    }
}

async fn render_snapshot(client: &Client, feed: &AlertFeed) {
    let operations = client.operations.list(Some("-start_time")).await;
    let maintenance = client
        .maintenance
        .filter_with(|m| m.status != MaintenanceStatus::Completed)
        .await;
    let drones = client.drones.list(None).await;
    let alerts = feed.retrieve().await;

    let active: Vec<_> = operations
        .iter()
        .filter(|op| op.status == OperationStatus::Active)
        .collect();

    println!();
    println!(
        "== Fleet snapshot {} | {} active / {} operations | {} airframes ==",
        Utc::now().format("%H:%M:%S"),
        active.len(),
        operations.len(),
        drones.len()
    );

    for op in &active {
        let position = match (op.latitude, op.longitude) {
            (Some(lat), Some(lon)) => format!("{lat:.4}, {lon:.4}"),
            _ => "position unknown".to_string(),
        };
        let stream = op
            .stream_url
            .as_deref()
            .map(|url| format!(" [live: {url}]"))
            .unwrap_or_default();
        println!(
            "  {} {} ({position}){stream}",
            op.incident_number.as_deref().unwrap_or("-"),
            op.name
        );
    }

    if !maintenance.is_empty() {
        println!("  maintenance pending: {}", maintenance.len());
        for item in &maintenance {
            let airframe = drones
                .iter()
                .find(|d| d.id == item.drone_id)
                .map(|d| d.callsign.clone())
                .unwrap_or_else(|| "unassigned airframe".to_string());
            println!("    {} - {}", airframe, item.description);
        }
    }

    for alert in &alerts {
        println!(
            "  !! CONVERGING TRAFFIC: {} ({}) alt {}m radius {}m - ack with `droneops ack {}`",
            alert.conflicting_op_name.as_deref().unwrap_or("unnamed operation"),
            alert.conflicting_pilot_name.as_deref().unwrap_or("unknown pilot"),
            alert.conflicting_op_altitude_m.unwrap_or(0.0),
            alert.conflicting_op_radius_m.unwrap_or(0.0),
            alert.id
        );
    }
}
