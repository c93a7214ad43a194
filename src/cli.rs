use clap::Parser;

use crate::core::digest::RunOptions;

/// Builds the daily activity digest and publishes it as a Google Doc.
#[derive(Parser, Debug)]
#[command(name = "daily_digest", version, about)]
pub struct Cli {
    /// Print the assembled Markdown instead of publishing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Leave the email section out
    #[arg(long)]
    pub skip_mail: bool,

    /// Leave the calendar section out
    #[arg(long)]
    pub skip_calendar: bool,

    /// Do not send the Telegram update
    #[arg(long)]
    pub skip_notify: bool,

    /// Do not create Todoist tasks
    #[arg(long)]
    pub skip_tasks: bool,
}

impl Cli {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            dry_run: self.dry_run,
            skip_mail: self.skip_mail,
            skip_calendar: self.skip_calendar,
            skip_notify: self.skip_notify,
            skip_tasks: self.skip_tasks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flags() {
        let cli = Cli::try_parse_from(["daily_digest"]).unwrap();
        assert_eq!(cli.run_options(), RunOptions::default());
    }

    #[test]
    fn test_flags_map_to_run_options() {
        let cli = Cli::try_parse_from(["daily_digest", "--dry-run", "--skip-mail", "--skip-tasks"])
            .unwrap();
        let options = cli.run_options();

        assert!(options.dry_run);
        assert!(options.skip_mail);
        assert!(!options.skip_calendar);
        assert!(!options.skip_notify);
        assert!(options.skip_tasks);
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Cli::try_parse_from(["daily_digest", "--publish-twice"]).is_err());
    }
}
