use clap::Parser;
use std::fmt;
use std::path::PathBuf;

use crate::{Result, ScrobbleError};

/// Scrobble tracks listed in a CSV file to Last.fm
#[derive(Parser, Clone)]
#[command(
    name = "csv-scrobbler",
    version,
    about = "Scrobble tracks listed in a CSV file to Last.fm",
    long_about = None
)]
pub struct Cli {
    /// Last.fm API key
    #[arg(short = 'k', long, env = "LASTFM_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Last.fm API shared secret
    #[arg(short = 's', long, env = "LASTFM_API_SECRET", hide_env_values = true)]
    pub api_secret: String,

    /// Last.fm username
    #[arg(short = 'u', long, env = "LASTFM_USERNAME")]
    pub username: String,

    /// Last.fm password
    #[arg(short = 'p', long, env = "LASTFM_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// CSV field delimiter (a single character, or "\t" / "tab")
    #[arg(short = 'd', long, default_value = ",")]
    pub delimiter: String,

    /// Treat the first row as column names (artist, track/title)
    #[arg(short = 'H', long)]
    pub header: bool,

    /// Show debug logging and full error details
    #[arg(short = 'D', long)]
    pub debug: bool,

    /// Resolve rows and print what would be scrobbled without contacting Last.fm
    #[arg(long)]
    pub dry_run: bool,

    /// CSV file to read (standard input when omitted)
    pub file: Option<PathBuf>,
}

/// Resolved, validated options for one run.
///
/// Built once at startup and handed to each component by reference.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: String,
    pub api_secret: String,
    pub username: String,
    pub password: String,
    pub delimiter: u8,
    pub has_header: bool,
    pub debug: bool,
    pub dry_run: bool,
    pub input: Option<PathBuf>,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let delimiter = parse_delimiter(&cli.delimiter)?;

        Ok(Self {
            api_key: cli.api_key,
            api_secret: cli.api_secret,
            username: cli.username,
            password: cli.password,
            delimiter,
            has_header: cli.header,
            debug: cli.debug,
            dry_run: cli.dry_run,
            input: cli.file,
        })
    }
}

// Keep credentials out of debug logs and error dumps
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("delimiter", &(self.delimiter as char))
            .field("has_header", &self.has_header)
            .field("debug", &self.debug)
            .field("dry_run", &self.dry_run)
            .field("input", &self.input)
            .finish()
    }
}

/// Parse the `--delimiter` value into the single byte the CSV reader wants.
pub fn parse_delimiter(value: &str) -> Result<u8> {
    if matches!(value, "\\t" | "tab") {
        return Ok(b'\t');
    }

    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c as u8),
        (Some(_), None) => Err(ScrobbleError::Argument(format!(
            "delimiter must be an ASCII character, got '{value}'"
        ))),
        _ => Err(ScrobbleError::Argument(format!(
            "delimiter must be a single character, got '{value}'"
        ))),
    }
}

// =============================================================================
// Exit codes
// =============================================================================

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

/// Exit code for a command line clap refused: 0 for `--help` and
/// `--version`, 1 for usage errors (clap itself would use 2).
pub fn parse_error_exit_code(err: &clap::Error) -> i32 {
    if err.use_stderr() {
        EXIT_FAILURE
    } else {
        EXIT_SUCCESS
    }
}

/// Map the outcome of a run to the process exit code.
///
/// Completion exits 0 whatever the per-row results. A fatal error is printed
/// and exits 1, except in debug mode where it is handed back as `Err` so it
/// can propagate out of `main`. Argument errors always exit 1.
pub fn exit_code<T>(outcome: Result<T>, debug: bool) -> std::result::Result<i32, ScrobbleError> {
    match outcome {
        Ok(_) => Ok(EXIT_SUCCESS),
        Err(e) if debug && !matches!(e, ScrobbleError::Argument(_)) => Err(e),
        Err(e) => {
            eprintln!("❌ {e}");
            Ok(EXIT_FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 9] = [
        "csv-scrobbler",
        "-k",
        "key",
        "-s",
        "secret",
        "-u",
        "alice",
        "-p",
        "hunter2",
    ];

    fn parse(extra: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(REQUIRED.iter().chain(extra.iter()).copied())
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_cli(parse(&[]).unwrap()).unwrap();
        assert_eq!(config.api_key, "key");
        assert_eq!(config.api_secret, "secret");
        assert_eq!(config.username, "alice");
        assert_eq!(config.password, "hunter2");
        assert_eq!(config.delimiter, b',');
        assert!(!config.has_header);
        assert!(!config.debug);
        assert!(!config.dry_run);
        assert_eq!(config.input, None);
    }

    #[test]
    fn test_short_flags_and_file() {
        let cli = parse(&["-d", ";", "-H", "-D", "plays.csv"]).unwrap();
        let config = Config::from_cli(cli).unwrap();
        assert_eq!(config.delimiter, b';');
        assert!(config.has_header);
        assert!(config.debug);
        assert_eq!(config.input, Some(PathBuf::from("plays.csv")));
    }

    #[test]
    fn test_long_flags() {
        let cli = Cli::try_parse_from([
            "csv-scrobbler",
            "--api-key",
            "key",
            "--api-secret",
            "secret",
            "--username",
            "alice",
            "--password",
            "pw",
            "--delimiter",
            "tab",
            "--header",
            "--dry-run",
        ])
        .unwrap();
        let config = Config::from_cli(cli).unwrap();
        assert_eq!(config.delimiter, b'\t');
        assert!(config.has_header);
        assert!(config.dry_run);
    }

    #[test]
    fn test_missing_required_flag_is_rejected() {
        let result = Cli::try_parse_from(["csv-scrobbler", "-k", "key", "-s", "secret", "-u", "alice"]);
        // The env fallback would satisfy the flag if the variable were set
        if std::env::var_os("LASTFM_PASSWORD").is_none() {
            let err = result.err().expect("password should be required");
            assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(",").unwrap(), b',');
        assert_eq!(parse_delimiter("|").unwrap(), b'|');
        assert_eq!(parse_delimiter("\\t").unwrap(), b'\t');
        assert_eq!(parse_delimiter("\t").unwrap(), b'\t');
        assert!(matches!(parse_delimiter(""), Err(ScrobbleError::Argument(_))));
        assert!(matches!(parse_delimiter(",,"), Err(ScrobbleError::Argument(_))));
        assert!(matches!(parse_delimiter("§"), Err(ScrobbleError::Argument(_))));
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let config = Config::from_cli(parse(&[]).unwrap()).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("\"secret\""));
        assert!(rendered.contains("alice"));
    }

    #[test]
    fn test_help_and_version_exit_zero() {
        for flag in ["--help", "-h", "--version"] {
            let err = Cli::try_parse_from(["csv-scrobbler", flag]).err().unwrap();
            assert_eq!(parse_error_exit_code(&err), EXIT_SUCCESS, "{flag}");
        }
    }

    #[test]
    fn test_usage_error_exits_one() {
        let err = parse(&["--no-such-flag"]).err().unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
        assert_eq!(parse_error_exit_code(&err), EXIT_FAILURE);
    }

    #[test]
    fn test_completed_run_exits_zero() {
        assert_eq!(exit_code(Ok(()), false).unwrap(), EXIT_SUCCESS);
        assert_eq!(exit_code(Ok(()), true).unwrap(), EXIT_SUCCESS);
    }

    #[test]
    fn test_fatal_error_exits_one() {
        let read_error = ScrobbleError::Read {
            source_name: "plays.csv".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(exit_code::<()>(Err(read_error), false).unwrap(), EXIT_FAILURE);

        let parse_error = ScrobbleError::Parse("unterminated quoted field".to_string());
        assert_eq!(exit_code::<()>(Err(parse_error), false).unwrap(), EXIT_FAILURE);
    }

    #[test]
    fn test_debug_mode_propagates_fatal_error() {
        let auth_error = ScrobbleError::Auth {
            code: 4,
            message: "Authentication Failed".to_string(),
            payload: serde_json::json!({"error": 4}),
        };
        match exit_code::<()>(Err(auth_error), true) {
            Err(ScrobbleError::Auth { code, .. }) => assert_eq!(code, 4),
            other => panic!("expected the auth error back, got {other:?}"),
        }
    }

    #[test]
    fn test_argument_error_exits_one_in_debug_mode() {
        let err = Config::from_cli(parse(&["-d", ",,", "-D"]).unwrap()).unwrap_err();
        assert_eq!(exit_code::<Config>(Err(err), true).unwrap(), EXIT_FAILURE);
    }
}
