//! signup - a terminal sign-up form with cascading state and city selection.
//!
//! State and city lists come from the region lookup API. The access token is
//! cached in a cookie jar under the cache directory, so repeated runs within a
//! day reuse it.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use signup_core::models::{CityName, FormField, SignUpForm, StateName};
use signup_core::{
    ApiClient, Config, CookieStore, DataLoader, FetchState, FileCookieStore, MemoryCookieStore,
    RegionDirectory,
};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ============================================================================
// Constants
// ============================================================================

/// Interval between checks of a pending load (in milliseconds)
const LOADING_POLL_INTERVAL_MS: u64 = 100;

/// Log file name prefix for `--log-file`
const LOG_FILE_PREFIX: &str = "signup.log";

const USAGE: &str = "\
Usage: signup [--log-file] [COMMAND]

Commands:
  (none)            Run the interactive sign-up form
  --states          Print the states of the configured country as JSON
  --cities <state>  Print the cities of a state as JSON
  --help            Show this message

Environment:
  SIGNUP_API_URL, SIGNUP_API_TOKEN, SIGNUP_USER_EMAIL, SIGNUP_COUNTRY
  RUST_LOG controls log verbosity (default: warn)";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr unless `log_dir` is given, in which case they are
/// written to a daily-rolling file. The returned guard must be kept alive
/// for buffered file output to be flushed.
fn init_tracing(log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let log_to_file = args.iter().any(|a| a == "--log-file");
    args.retain(|a| a != "--log-file");

    if args.first().map(String::as_str) == Some("--help") {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = Config::load()?;
    let log_dir = if log_to_file {
        Some(config.cache_dir()?)
    } else {
        None
    };
    let _guard = init_tracing(log_dir);
    info!("signup starting");

    let api = build_client(&config)?;

    match args.first().map(String::as_str) {
        Some("--states") => print_states(api, &config).await,
        Some("--cities") => {
            let state = args.get(1).context("Usage: signup --cities <state>")?;
            print_cities(api, &config, state).await
        }
        Some(other) => bail!("Unknown argument: {}\n\n{}", other, USAGE),
        None => run_form(api, &config).await,
    }
}

fn build_client(config: &Config) -> Result<ApiClient> {
    let credentials = config.credentials()?;
    let cookies: Arc<dyn CookieStore> = if config.persist_cookies {
        let dir = config.cache_dir()?;
        Arc::new(FileCookieStore::open(&dir).context("Failed to open cookie jar")?)
    } else {
        Arc::new(MemoryCookieStore::new())
    };
    ApiClient::new(credentials, cookies)
}

async fn print_states(api: ApiClient, config: &Config) -> Result<()> {
    let mut directory = RegionDirectory::new(api, &config.country);
    let states = directory.states().await?;
    println!("{}", serde_json::to_string_pretty(states)?);
    Ok(())
}

async fn print_cities(api: ApiClient, config: &Config, state: &str) -> Result<()> {
    let mut directory = RegionDirectory::new(api, &config.country);
    let cities = directory.cities(state).await?;
    println!("{}", serde_json::to_string_pretty(cities)?);
    Ok(())
}

// ============================================================================
// Interactive form
// ============================================================================

async fn run_form(api: ApiClient, config: &Config) -> Result<()> {
    println!("Sign Up\n");

    let mut form = SignUpForm::new();
    form.first_name = prompt("First Name*: ")?;
    form.last_name = prompt("Last Name*: ")?;

    let mut states_loader: DataLoader<Vec<StateName>> = DataLoader::new(api.clone());
    states_loader.set_url(&api.state_api_url(&config.country));
    let states = match wait_for(&mut states_loader, "Loading states").await {
        FetchState { error: Some(e), .. } => bail!("Could not load states: {}", e),
        FetchState { data: Some(states), .. } if !states.is_empty() => states.clone(),
        _ => bail!("No states available for {}", config.country),
    };

    let mut directory = RegionDirectory::new(api.clone(), &config.country);
    let mut cities_loader: DataLoader<Vec<CityName>> = DataLoader::new(api.clone());

    loop {
        let state_names: Vec<&str> = states.iter().map(StateName::as_str).collect();
        let Some(index) = pick("Select a state", &state_names, false)? else {
            continue;
        };
        form.select_state(state_names[index]);

        let cities = match directory.cached_cities(&form.state) {
            Some(cities) => cities.to_vec(),
            None => {
                cities_loader.set_url(&api.city_api_url(&form.state));
                match wait_for(&mut cities_loader, "Loading cities").await {
                    FetchState { error: Some(e), .. } => {
                        eprintln!("Could not load cities: {}", e);
                        continue;
                    }
                    FetchState { data: Some(cities), .. } => {
                        directory.remember_cities(&form.state, cities.clone());
                        cities.clone()
                    }
                    _ => Vec::new(),
                }
            }
        };

        if cities.is_empty() {
            eprintln!("No cities found for {}", form.state);
            continue;
        }

        let city_names: Vec<&str> = cities.iter().map(CityName::as_str).collect();
        match pick("Select a city", &city_names, true)? {
            Some(index) => {
                form.select_city(city_names[index]);
                break;
            }
            // Back to state selection
            None => continue,
        }
    }

    form.email = prompt("Email*: ")?;
    form.password = rpassword::prompt_password("Password*: ")?;

    let registration = loop {
        match form.submit() {
            Ok(registration) => break registration,
            Err(errors) => {
                for error in &errors {
                    eprintln!("  {}", error);
                }
                for error in &errors {
                    refill(&mut form, error.field)?;
                }
            }
        }
    };

    info!(email = %registration.email, state = %registration.state, "Registration submitted");
    println!("{}", serde_json::to_string_pretty(&registration)?);
    Ok(())
}

/// Poll a loader while its fetch task runs, printing progress dots
async fn wait_for<'a, T>(loader: &'a mut DataLoader<T>, label: &str) -> &'a FetchState<T>
where
    T: serde::de::DeserializeOwned + Send + 'static,
{
    if loader.is_pending() {
        eprint!("{}", label);
        while loader.is_pending() {
            if !loader.poll() {
                eprint!(".");
                let _ = io::stderr().flush();
                tokio::time::sleep(Duration::from_millis(LOADING_POLL_INTERVAL_MS)).await;
            }
        }
        eprintln!();
    }
    // Applies the final result, or reports a task that ended without one
    loader.settle().await
}

fn refill(form: &mut SignUpForm, field: FormField) -> Result<()> {
    let label = format!("{}*: ", field.label());
    match field {
        FormField::FirstName => form.first_name = prompt(&label)?,
        FormField::LastName => form.last_name = prompt(&label)?,
        FormField::Email => form.email = prompt(&label)?,
        FormField::Password => form.password = rpassword::prompt_password(&label)?,
        // Chosen from the lists above; only reachable if the API returned blank names
        FormField::State | FormField::City => {
            warn!(field = field.label(), "Selected value is blank");
            bail!("{} is required but the API returned an empty name", field.label());
        }
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line)?;
    if read == 0 {
        bail!("Input closed");
    }
    Ok(line.trim().to_string())
}

/// Show a numbered list and read a choice by number or exact name.
/// With `allow_back`, entering 0 returns `None`.
fn pick(title: &str, options: &[&str], allow_back: bool) -> Result<Option<usize>> {
    println!("\n{}:", title);
    if allow_back {
        println!("  0) <back>");
    }
    for (i, option) in options.iter().enumerate() {
        println!("  {}) {}", i + 1, option);
    }

    loop {
        let answer = prompt("> ")?;
        if let Ok(n) = answer.parse::<usize>() {
            if n == 0 && allow_back {
                return Ok(None);
            }
            if (1..=options.len()).contains(&n) {
                return Ok(Some(n - 1));
            }
        } else if let Some(i) = options.iter().position(|o| o.eq_ignore_ascii_case(&answer)) {
            return Ok(Some(i));
        }
        eprintln!("Please choose one of the listed options");
    }
}
