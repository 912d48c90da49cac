use clap::{Arg, ArgAction, ArgMatches, ColorChoice, Command};

pub struct Cli {
    /// Arguments passed by user
    pub matches: ArgMatches,
}

impl Default for Cli {
    fn default() -> Self {
        Self::new()
    }
}

impl Cli {
    /// Build new command line interface
    pub fn new() -> Self {
        Self {
            matches: Command::new("srnx")
                .author("Guillaume W. Bres, <guillaume.bressaix@gmail.com>")
                .version(env!("CARGO_PKG_VERSION"))
                .about("Converts RINEX observation files to and from the SRNX binary container")
                .arg_required_else_help(true)
                .color(ColorChoice::Always)
                .arg(
                    Arg::new("input")
                        .value_name("INPUT")
                        .action(ArgAction::Set)
                        .required(true)
                        .help("Input file: a RINEX observation file (\".rnx\"/\".<yy>o\"), a \".srnx\" container, or \"-\" for standard input."),
                )
                .arg(
                    Arg::new("output")
                        .value_name("OUTPUT")
                        .action(ArgAction::Set)
                        .required(false)
                        .help("Output file. Defaults to the input path with its extension swapped to \".srnx\" when compressing, or \".rnx\" when decompressing."),
                )
                .arg(
                    Arg::new("quiet")
                        .short('q')
                        .long("quiet")
                        .action(ArgAction::SetTrue)
                        .help("Disable all terminal output."),
                )
                .get_matches(),
        }
    }

    pub fn input_path(&self) -> &str {
        self.matches.get_one::<String>("input").expect("required")
    }

    pub fn output_path(&self) -> Option<&str> {
        self.matches.get_one::<String>("output").map(String::as_str)
    }

    pub fn quiet(&self) -> bool {
        self.matches.get_flag("quiet")
    }
}
