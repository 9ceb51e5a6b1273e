use anyhow::{Result, bail};
use owo_colors::OwoColorize;
use serde::Deserialize;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const DEFAULT_API_HOST: &str = "http://localhost:5050";

const USAGE: &str = "\
challenge-cli - unlock and manage your achievement badges

Usage:
  challenge-cli unlock-badge <badge_name> <challenge_id>
  challenge-cli list-badges
  challenge-cli status

Environment:
  ACHIEVEMENT_API_HOST  API base URL (default http://localhost:5050)
  USERNAME / USER       Badge owner";

#[derive(Debug, PartialEq)]
enum Command {
    UnlockBadge {
        badge_name: String,
        challenge_id: String,
    },
    ListBadges,
    Status,
    Help,
}

#[derive(Deserialize)]
struct MessageBody {
    message: Option<String>,
}

#[derive(Deserialize)]
struct BadgeRow {
    badge_name: String,
    challenge_id: String,
    earned_date: Option<String>,
}

#[derive(Deserialize)]
struct StatusBody {
    version: Option<String>,
    storage: Option<String>,
    total_badges: Option<u64>,
    total_users: Option<u64>,
}

/// Why a command failed: the API answered with an error, or could not be reached.
enum Failure {
    Api(String),
    Unreachable(reqwest::Error),
}

impl From<reqwest::Error> for Failure {
    fn from(e: reqwest::Error) -> Self {
        Failure::Unreachable(e)
    }
}

struct ApiClient {
    api_host: String,
    client: reqwest::Client,
}

impl ApiClient {
    fn new(api_host: &str) -> Self {
        Self {
            api_host: api_host.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn unlock_badge(
        &self,
        username: &str,
        badge_name: &str,
        challenge_id: &str,
    ) -> Result<(), Failure> {
        let resp = self
            .client
            .post(format!("{}/api/badges", self.api_host))
            .json(&serde_json::json!({
                "username": username,
                "badge_name": badge_name,
                "challenge_id": challenge_id,
            }))
            .send()
            .await?;

        match unlock_message(resp.status().as_u16(), badge_name) {
            Some(message) => {
                println!("{}", message);
                Ok(())
            }
            None => Err(Failure::Api(error_message(resp).await)),
        }
    }

    async fn list_badges(&self, username: &str) -> Result<(), Failure> {
        let resp = self
            .client
            .get(format!(
                "{}/api/badges/{}",
                self.api_host,
                urlencoding::encode(username)
            ))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Failure::Api(error_message(resp).await));
        }

        let badges: Vec<BadgeRow> = resp.json().await?;
        if badges.is_empty() {
            println!("\n{}", "You haven't earned any badges yet.".yellow());
            println!("\nComplete challenges to earn badges!");
            return Ok(());
        }

        let rows: Vec<Vec<String>> = badges
            .into_iter()
            .map(|b| {
                vec![
                    b.badge_name,
                    b.challenge_id,
                    b.earned_date.unwrap_or_else(|| "Unknown".to_string()),
                ]
            })
            .collect();

        let heading = format!("Badges earned by {}:", username);
        println!("\n{}\n", heading.cyan());
        println!(
            "{}",
            render_table(&["Badge", "Challenge", "Earned Date"], &rows)
        );
        Ok(())
    }

    async fn status(&self) -> Result<(), Failure> {
        let resp = self
            .client
            .get(format!("{}/api/status", self.api_host))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Failure::Api(error_message(resp).await));
        }

        let status: StatusBody = resp.json().await?;
        println!("\n{}", "Achievement API Status:".green());
        println!("  Status: {}", "Online".green());
        println!(
            "  Version: {}",
            status.version.as_deref().unwrap_or("Unknown")
        );
        println!(
            "  Storage: {}",
            status.storage.as_deref().unwrap_or("Unknown")
        );
        println!("  Total Badges: {}", status.total_badges.unwrap_or(0));
        println!("  Total Users: {}", status.total_users.unwrap_or(0));
        Ok(())
    }
}

/// Colored lines for the two successful unlock outcomes (201 new, 200 owned).
fn unlock_message(status: u16, badge_name: &str) -> Option<String> {
    match status {
        201 => {
            let unlocked = format!("🏆 Congratulations! Badge '{}' unlocked!", badge_name);
            Some(format!(
                "\n{}\n\nYou can view all your badges with: {}",
                unlocked.green(),
                "challenge-cli list-badges".cyan()
            ))
        }
        200 => {
            let owned = format!("You already have the '{}' badge.", badge_name);
            Some(format!("\n{}", owned.yellow()))
        }
        _ => None,
    }
}

async fn error_message(resp: reqwest::Response) -> String {
    let status = resp.status();
    match resp.json::<MessageBody>().await {
        Ok(MessageBody {
            message: Some(message),
        }) => message,
        _ => format!("Unknown error (HTTP {})", status.as_u16()),
    }
}

fn parse_command(args: &[String]) -> Result<Command> {
    match args.get(1).map(String::as_str) {
        Some("unlock-badge") => match (args.get(2), args.get(3)) {
            (Some(badge_name), Some(challenge_id)) => Ok(Command::UnlockBadge {
                badge_name: badge_name.clone(),
                challenge_id: challenge_id.clone(),
            }),
            _ => bail!("unlock-badge requires <badge_name> <challenge_id>"),
        },
        Some("list-badges") => Ok(Command::ListBadges),
        Some("status") => Ok(Command::Status),
        None | Some("help") | Some("--help") | Some("-h") => Ok(Command::Help),
        Some(other) => bail!("Unknown command: {}", other),
    }
}

fn resolve_username(var: impl Fn(&str) -> Option<String>) -> String {
    ["USERNAME", "USER"]
        .iter()
        .find_map(|name| var(name).filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Grid table in the style of `+---+` bordered rows, header separated by `=`.
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let border = |fill: char| {
        let mut line = String::from("+");
        for width in &widths {
            line.push_str(&fill.to_string().repeat(width + 2));
            line.push('+');
        }
        line
    };
    let format_row = |cells: Vec<&str>| {
        let mut line = String::from("|");
        for (cell, width) in cells.iter().zip(&widths) {
            let pad = width - cell.chars().count();
            line.push_str(&format!(" {}{} |", cell, " ".repeat(pad)));
        }
        line
    };

    let mut lines = vec![
        border('-'),
        format_row(headers.to_vec()),
        border('='),
    ];
    for row in rows {
        lines.push(format_row(row.iter().map(String::as_str).collect()));
        lines.push(border('-'));
    }
    lines.join("\n")
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = match parse_command(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("\n{}", format!("Error: {}", e).red());
            eprintln!("\n{}", USAGE);
            return ExitCode::FAILURE;
        }
    };

    let api_host =
        std::env::var("ACHIEVEMENT_API_HOST").unwrap_or_else(|_| DEFAULT_API_HOST.to_string());
    let client = ApiClient::new(&api_host);
    let username = resolve_username(|name| std::env::var(name).ok());
    tracing::debug!("Using API {} as {}", client.api_host, username);

    let result = match command {
        Command::UnlockBadge {
            badge_name,
            challenge_id,
        } => {
            client
                .unlock_badge(&username, &badge_name, &challenge_id)
                .await
        }
        Command::ListBadges => client.list_badges(&username).await,
        Command::Status => client.status().await,
        Command::Help => {
            println!("{}", USAGE);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(Failure::Api(message)) => {
            eprintln!("\n{}", format!("Error: {}", message).red());
            ExitCode::FAILURE
        }
        Err(Failure::Unreachable(e)) => {
            let failure = format!("Error connecting to achievement API: {}", e);
            eprintln!("\n{}", failure.red());
            eprintln!(
                "\nMake sure the achievement API is running at {}",
                client.api_host
            );
            ExitCode::FAILURE
        }
    }
}
