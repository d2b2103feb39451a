use std::env;
use std::path::PathBuf;

use argh::FromArgs;

/// A small interactive shell: built-in `cd` and `exit`, external programs with `<`, `>` and `>>`.
#[derive(FromArgs, Debug)]
pub struct Args {
    /// label shown in front of the working directory in the prompt
    #[argh(option, default = "String::from(\"minish\")")]
    pub prompt: String,

    /// let programs without a redirection use the terminal instead of /dev/null
    #[argh(switch, short = 'i')]
    pub inherit_stdio: bool,

    /// stay in the current directory instead of starting in $HOME
    #[argh(switch)]
    pub keep_cwd: bool,

    /// file to load line history from at startup and save it to at exit
    #[argh(option)]
    pub history: Option<PathBuf>,
}

/// What a child's standard input/output is bound to when the command line does not redirect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StdioDefault {
    /// The null device: output is discarded, input is empty.
    #[default]
    Null,
    /// Whatever the interpreter itself is connected to.
    Inherit,
    /// Output is inherited, input comes from the null device.
    InheritOutput,
}

impl StdioDefault {
    pub fn input_is_null(self) -> bool {
        self != StdioDefault::Inherit
    }

    pub fn output_is_null(self) -> bool {
        self == StdioDefault::Null
    }
}

#[derive(Debug, Clone)]
pub struct ShellConfig {
    pub prompt_label: String,
    pub home: Option<PathBuf>,
    pub stdio: StdioDefault,
    pub start_in_home: bool,
    pub history_file: Option<PathBuf>,
}

impl ShellConfig {
    pub fn from_args(args: Args) -> Self {
        Self {
            prompt_label: args.prompt,
            home: home_dir(),
            stdio: if args.inherit_stdio {
                StdioDefault::Inherit
            } else {
                StdioDefault::Null
            },
            start_in_home: !args.keep_cwd,
            history_file: args.history,
        }
    }

    /// Commands are read from a non-terminal stdin that the shell buffers ahead, so a child
    /// inheriting it would see a stream with an unknown part already consumed.
    pub fn for_piped_input(mut self) -> Self {
        if self.stdio == StdioDefault::Inherit {
            self.stdio = StdioDefault::InheritOutput;
        }
        self
    }

    /// The home directory as UTF-8, which is what tilde expansion splices into tokens.
    pub fn home_str(&self) -> Option<&str> {
        self.home.as_deref().and_then(|home| home.to_str())
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt_label: "minish".to_string(),
            home: home_dir(),
            stdio: StdioDefault::default(),
            start_in_home: true,
            history_file: None,
        }
    }
}

/// Reads `HOME`; an empty value counts as unset.
fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}
