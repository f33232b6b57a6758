use std::env;
use std::fs;
use std::process;

use sonify::audio::{wav, OfflineEngine};
use sonify::{Chart, SonificationEvent};
use tracing_subscriber::EnvFilter;

const SAMPLE_RATE: u32 = 44_100;

fn usage() -> ! {
    eprintln!("Usage: sonify <chart.yaml> [output.wav]");
    eprintln!("       sonify --json <chart.yaml>");
    process::exit(1);
}

#[derive(Debug, PartialEq)]
enum Command {
    Json { input: String },
    Render { input: String, output: Option<String> },
}

fn parse_args(args: &[String]) -> Option<Command> {
    match args {
        [flag, input] if flag == "--json" => Some(Command::Json {
            input: input.clone(),
        }),
        [flag, ..] if flag == "--json" => None,
        [input] => Some(Command::Render {
            input: input.clone(),
            output: None,
        }),
        [input, output] => Some(Command::Render {
            input: input.clone(),
            output: Some(output.clone()),
        }),
        _ => None,
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = parse_args(&args) else {
        usage();
    };
    let (json, input_path, output_path) = match &command {
        Command::Json { input } => (true, input, None),
        Command::Render { input, output } => (false, input, output.as_ref()),
    };

    // Read input file
    let source = match fs::read_to_string(input_path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", input_path, e);
            process::exit(1);
        }
    };

    let mut chart = match Chart::from_yaml(&source) {
        Ok(chart) => chart,
        Err(e) => {
            eprintln!("Error loading chart: {}", e);
            process::exit(1);
        }
    };

    if json {
        let schedules = match sonify::plan_chart(&chart) {
            Ok(schedules) => schedules,
            Err(e) => {
                eprintln!("Error planning chart: {}", e);
                process::exit(1);
            }
        };
        match serde_json::to_string_pretty(&schedules) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error encoding schedules: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    let mut engine = match OfflineEngine::new(SAMPLE_RATE, 2) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error creating audio engine: {}", e);
            process::exit(1);
        }
    };

    let timeline = match sonify::render_chart(&mut chart, &mut engine) {
        Ok(timeline) => timeline,
        Err(e) => {
            eprintln!("Sonification error: {}", e);
            process::exit(1);
        }
    };

    for entry in &timeline {
        match &entry.event {
            SonificationEvent::SeriesStarted { series } => {
                println!("{:>8.3}s  series {} started", entry.time, series)
            }
            SonificationEvent::PointHighlighted { point } => {
                let value = chart.series[point.series].data[point.point];
                match value {
                    Some(v) => println!("{:>8.3}s    point {} = {}", entry.time, point.point, v),
                    None => println!("{:>8.3}s    point {} = null", entry.time, point.point),
                }
            }
            SonificationEvent::HighlightSkipped { point, reason } => {
                println!("{:>8.3}s    point {} skipped: {}", entry.time, point.point, reason)
            }
            SonificationEvent::SeriesCompleted { series } => {
                println!("{:>8.3}s  series {} completed", entry.time, series)
            }
            SonificationEvent::ChartCompleted => println!("{:>8.3}s  done", entry.time),
        }
    }

    // Output
    if let Some(path) = output_path {
        if let Err(e) = wav::write_wav_16bit(path, engine.samples(), SAMPLE_RATE, 2) {
            eprintln!("Error writing to '{}': {}", path, e);
            process::exit(1);
        }
        eprintln!("Wrote {:.1}s of audio to {}", engine.samples().len() as f64 / 2.0 / SAMPLE_RATE as f64, path);
    }
}
