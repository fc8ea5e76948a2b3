use colored::*;
use marketplace_booking::config::Config;
use marketplace_booking::domain::models::calendar::weekday_to_str;
use marketplace_booking::domain::models::wall_clock::parse_calendar_date;
use marketplace_booking::init_logging;
use std::process::ExitCode;

const USAGE: &str = "usage: calendar <service_id> [start YYYY-MM-DD] [end YYYY-MM-DD]";

#[tokio::main]
async fn main() -> ExitCode {
    let _guard = init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(service_id) = args.first() else {
        eprintln!("{}", USAGE.yellow());
        return ExitCode::from(2);
    };

    let range = (
        args.get(1).map(|s| parse_calendar_date(s)).transpose(),
        args.get(2).map(|s| parse_calendar_date(s)).transpose(),
    );
    let (start, end) = match range {
        (Ok(start), Ok(end)) => (start, end),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("{} {}", "Invalid date:".red().bold(), e);
            eprintln!("{}", USAGE.yellow());
            return ExitCode::from(2);
        }
    };

    let config = match Config::from_env() {
        Ok(config) => Config { notifications_enabled: false, ..config },
        Err(e) => {
            eprintln!("{} {}", "Configuration error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    let state = match marketplace_booking::start(&config).await {
        Ok(state) => state,
        Err(e) => {
            eprintln!("{} {}", "Failed to start engine:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    println!("{} {}", "Availability for service".bold(), service_id.cyan().bold());

    let days = state.availability.calendar_view(service_id, start, end).await;
    if days.is_empty() {
        println!("{}", "No bookable dates in range.".yellow());
        return ExitCode::SUCCESS;
    }

    for day in days {
        let label = format!("{} {:<9}", day.date, weekday_to_str(day.day_of_week));
        if day.slots.is_empty() {
            println!("  {}  {}", label.dimmed(), "no free slots".red());
            continue;
        }
        let times: Vec<String> = day.slots.iter().map(|s| s.slot_time.to_string()).collect();
        println!("  {}  {}", label.green(), times.join("  "));
    }

    ExitCode::SUCCESS
}
