use std::{
    cell::RefCell,
    io::Write,
    path::{Path, PathBuf},
    process::ExitCode,
    rc::Rc,
};

use clap::{Args, Parser, Subcommand};
use squeak::{
    hook::{Headers, Hook, HttpRequest, HttpResponse},
    tokenizer::{Lexer, TokenType},
    Interpreter, Object,
};

#[derive(Debug, Parser)]
#[command(version, about = "Interpreter for Squeak hook scripts")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn command(&self) -> &Command {
        self.command.as_ref().unwrap_or(&Command::Repl)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Execute a script file
    Run(FileArgs),
    /// Read and execute statements line by line
    Repl,
    /// Print the tokens of a script file
    Tokens(FileArgs),
    /// Print the parsed program with resolved scope levels
    Ast(FileArgs),
    /// Run a hook script against a request, or against a response when a status is given
    Hook(HookArgs),
}

#[derive(Debug, Args)]
struct FileArgs {
    file: PathBuf,
}

#[derive(Debug, Args)]
struct HookArgs {
    file: PathBuf,
    #[arg(long, default_value = "GET")]
    method: String,
    #[arg(long, default_value = "")]
    url: String,
    /// Header as NAME=VALUE, may be repeated
    #[arg(long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,
    /// Response status code, runs the script as an after-hook
    #[arg(long)]
    status: Option<u16>,
    /// File holding the response body
    #[arg(long)]
    body: Option<PathBuf>,
}

fn parse_header(header: &str) -> Result<(String, String), String> {
    match header.split_once('=') {
        Some((name, value)) => Ok((name.trim().to_string(), value.trim().to_string())),
        None => Err(format!("expected NAME=VALUE but found {header}")),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let args = Cli::parse();

    let result = match args.command() {
        Command::Repl => repl_command(),
        Command::Run(args) => run_command(&args.file),
        Command::Tokens(args) => tokens_command(&args.file),
        Command::Ast(args) => ast_command(&args.file),
        Command::Hook(args) => hook_command(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn stdout() -> Rc<RefCell<dyn Write>> {
    Rc::new(RefCell::new(std::io::stdout()))
}

fn repl_command() -> Result<(), squeak::Error> {
    println!("Welcome to the Squeak REPL!");
    println!("EOF to exit. (Ctrl+D on *nix, Ctrl+Z on Windows)");

    let mut interpreter = Interpreter::new(std::env::current_dir()?, stdout());
    let mut input = String::new();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        if std::io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        let result = squeak::parse_str(input.trim())
            .map_err(squeak::Error::from)
            .and_then(|program| Ok(interpreter.execute(&program)?));
        if let Err(e) = result {
            println!("Error: {}", e);
        }
        println!();
        input.clear();
    }
    Ok(())
}

fn run_command(file: &Path) -> Result<(), squeak::Error> {
    Interpreter::new(".", stdout()).execute_file(file)
}

fn tokens_command(file: &Path) -> Result<(), squeak::Error> {
    let mut lexer = Lexer::new(std::fs::File::open(file)?);
    let mut line = 0;
    loop {
        let token = lexer
            .next_token()
            .map_err(|e| squeak::ParseErrors::from(squeak::ParseError::from(e)))?;
        if lexer.line() != line {
            print!("{:4} ", lexer.line());
            line = lexer.line();
        } else {
            print!("   | ");
        }

        println!("{:<12} {}", format!("{:?}", token.token_type), token.lexeme);

        if token.token_type == TokenType::Eof {
            break;
        }
    }
    Ok(())
}

fn ast_command(file: &Path) -> Result<(), squeak::Error> {
    let program = squeak::parse(std::fs::File::open(file)?)?;
    print!("{}", program);
    Ok(())
}

fn hook_command(args: &HookArgs) -> Result<(), squeak::Error> {
    let source = std::fs::read_to_string(&args.file)?;
    let working_dir = args
        .file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let mut headers = Headers::new();
    for (name, value) in &args.headers {
        headers.entry(name.clone()).or_default().push(value.clone());
    }

    let hook = Hook::new(working_dir, stdout());
    let exports = match args.status {
        None => hook.before(
            &source,
            &HttpRequest {
                method: args.method.clone(),
                url: args.url.clone(),
                headers,
            },
        )?,
        Some(status_code) => {
            let body = match &args.body {
                Some(path) => std::fs::read(path)?,
                None => Vec::new(),
            };
            hook.after(
                &source,
                &HttpResponse {
                    status_code,
                    status: status_code.to_string(),
                    headers,
                    body,
                },
            )?
        }
    };

    let mut exports: Vec<(String, Object)> = exports.into_iter().collect();
    exports.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, value) in exports {
        println!("{} = {}", name, value);
    }
    Ok(())
}
