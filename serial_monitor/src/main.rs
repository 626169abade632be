use std::env;
use striker_vision::pipeline::Message;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

#[derive(Debug, Default)]
struct Tally {
    ball: u64,
    goals: u64,
    compact: u64,
    malformed: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // --- 1. Argument Parsing & Setup ---
    let args: Vec<String> = env::args().collect();
    if args.len() > 2 {
        println!("Usage: serial_monitor [capture_file]");
        return Ok(());
    }

    let input: Box<dyn AsyncRead + Unpin + Send> = match args.get(1) {
        Some(path) => Box::new(tokio::fs::File::open(path).await?),
        None => Box::new(tokio::io::stdin()),
    };

    // --- 2. Decode Loop ---
    let mut lines = BufReader::new(input).lines();
    let mut tally = Tally::default();
    while let Some(line) = lines.next_line().await? {
        if line.is_empty() {
            continue;
        }
        match line.parse::<Message>() {
            Ok(message) => {
                describe(&message);
                match message {
                    Message::Ball { .. } => tally.ball += 1,
                    Message::Goal { .. } => tally.goals += 1,
                    Message::CompactBall { .. } | Message::CompactGoal { .. } => tally.compact += 1,
                }
            }
            Err(e) => {
                tally.malformed += 1;
                log::warn!("{e}");
            }
        }
    }

    // --- 3. Summary ---
    log::info!(
        "ball lines: {}, goal lines: {}, compact lines: {}, malformed: {}",
        tally.ball,
        tally.goals,
        tally.compact,
        tally.malformed
    );
    Ok(())
}

fn describe(message: &Message) {
    match message {
        Message::Ball {
            x,
            y,
            x_velocity,
            y_velocity,
            theta,
            confidence,
        } => println!(
            "ball   at ({x:7.1}, {y:7.1}) cm  v=({x_velocity:8.1}, {y_velocity:8.1}) cm/s  {:6.1}°  conf {confidence}",
            theta.to_degrees()
        ),
        Message::Goal {
            name,
            distance,
            theta,
            size,
            confidence,
        } => {
            let size = size
                .map(|(w, h)| format!("  {w:.1}x{h:.1} cm"))
                .unwrap_or_default();
            let confidence = confidence.map(|c| format!("  conf {c}")).unwrap_or_default();
            println!("{name:6} {distance:7.1} cm  {:6.1}°{size}{confidence}", theta.to_degrees());
        }
        Message::CompactBall { degrees, pixels } => println!("BALL   {degrees:3}°  {pixels} px"),
        Message::CompactGoal { degrees, pixels } => println!("GOAL   {degrees:3}°  {pixels} px"),
    }
}
