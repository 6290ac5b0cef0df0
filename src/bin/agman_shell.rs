//!
//! agman operator shell
//! ---------------------
//! Interactive shell for exercising the admin console's session machinery
//! against a live auth backend: log in and out, inspect the session, walk
//! protected routes through the real route guard and watch the 401 policy
//! act on raw API calls.

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use agman::config::app_urls;
use agman::guard::{GuardView, RouteGuard};
use agman::http::ApiClient;
use agman::identity::{Credentials, HttpAuthBackend, SessionStore};
use agman::routing::{Destination, Navigator, RoleRouter};
use agman::storage::ClientStorage;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--api <url>] [--login-url <url>] [--user <u> --password <p>]\n\nFlags:\n  --api <url>        Auth API base (default: $AGMAN_API_BASE_URL or http://localhost:8000/api/v1)\n  --login-url <url>  Login page base used for redirects (default: $AGMAN_LOGIN_PAGE_URL)\n  --user <u>         Log in as this user on startup\n  --password <p>     Password for --user\n  -h, --help         Show this help\n\nInteractive commands:\n  login <username> <password>   authenticate and follow the role's home destination\n  logout                        drop the session and land on the login page\n  whoami                        resolve and show the current identity\n  open <path>                   walk to an admin route through the route guard\n  get <path>                    raw API GET (shows the 401 policy on protected paths)\n  status                        show session state, epoch and current path\n  help                          show this help\n  quit | exit                   leave the shell"
    );
}

/// Navigator backed by a pretend address bar. External hops are printed but
/// not followed; they would leave this app.
struct ShellNavigator {
    path: Mutex<String>,
}

impl ShellNavigator {
    fn new() -> ShellNavigator {
        ShellNavigator { path: Mutex::new("/".to_string()) }
    }
}

impl Navigator for ShellNavigator {
    fn current_path(&self) -> String {
        self.path.lock().clone()
    }

    fn go(&self, dest: &Destination) {
        match dest {
            Destination::InApp(route) => {
                *self.path.lock() = route.clone();
                println!("-> {}", route);
            }
            Destination::ExternalApp { .. } => {
                println!("-> {} (external)", dest.href());
            }
        }
    }
}

fn main() -> Result<()> {
    println!(
        r"   __ _  __ _ _ __ ___   __ _ _ __
  / _` |/ _` | '_ ` _ \ / _` | '_ \
 | (_| | (_| | | | | | | (_| | | | |
  \__,_|\__, |_| |_| |_|\__,_|_| |_|
        |___/   admin console shell"
    );
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);

    let mut api_base: Option<String> = None;
    let mut login_url: Option<String> = None;
    let mut auto_user: Option<String> = None;
    let mut auto_password: Option<String> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--api" => {
                if i + 1 >= args.len() { eprintln!("--api requires a value"); print_usage(&program); std::process::exit(2); }
                api_base = Some(args[i + 1].clone());
                i += 2; continue;
            }
            "--login-url" => {
                if i + 1 >= args.len() { eprintln!("--login-url requires a value"); print_usage(&program); std::process::exit(2); }
                login_url = Some(args[i + 1].clone());
                i += 2; continue;
            }
            "--user" => {
                if i + 1 >= args.len() { eprintln!("--user requires a value"); print_usage(&program); std::process::exit(2); }
                auto_user = Some(args[i + 1].clone());
                i += 2; continue;
            }
            "--password" => {
                if i + 1 >= args.len() { eprintln!("--password requires a value"); print_usage(&program); std::process::exit(2); }
                auto_password = Some(args[i + 1].clone());
                i += 2; continue;
            }
            "-h" | "--help" => {
                print_usage(&program);
                return Ok(());
            }
            unk => {
                eprintln!("Unrecognized argument: {}", unk);
                print_usage(&program);
                std::process::exit(2);
            }
        }
    }

    let mut urls = app_urls().clone();
    if let Some(api) = api_base {
        urls.api_base = api;
    }
    if let Some(login) = login_url {
        urls.login_page = login;
    }

    let navigator = Arc::new(ShellNavigator::new());
    let router = Arc::new(RoleRouter::new(urls, navigator.clone()));
    let api = ApiClient::new(&router.urls().api_base, router.clone())?;
    let backend = Arc::new(HttpAuthBackend::new(&api));
    let storage = ClientStorage::new();
    let store = SessionStore::new(backend, router.clone(), storage);

    // Tokio runtime
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    println!("auth API: {}", router.urls().api_base);
    println!("type 'help' for commands");

    if let (Some(user), Some(pass)) = (auto_user, auto_password) {
        match rt.block_on(store.login(&Credentials::new(user.clone(), pass))) {
            Ok(u) => println!("logged in as {} ({})", u.username, u.role),
            Err(e) => eprintln!("auto-login failed: {}", e),
        }
    }

    let mut rl = DefaultEditor::new()?;
    loop {
        let line = match rl.readline("agman> ") {
            Ok(l) => l,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line.as_str());
        let mut parts = line.split_whitespace();
        let cmd = parts.next().unwrap_or("");
        match cmd {
            "help" => print_usage(&program),
            "quit" | "exit" => break,
            "login" => {
                let (Some(user), Some(pass)) = (parts.next(), parts.next()) else {
                    eprintln!("usage: login <username> <password>");
                    continue;
                };
                match rt.block_on(store.login(&Credentials::new(user, pass))) {
                    Ok(u) => println!("logged in as {} ({})", u.username, u.role),
                    Err(e) => eprintln!("login failed: {}", e),
                }
            }
            "logout" => {
                rt.block_on(store.logout());
                println!("logged out");
            }
            "whoami" => match rt.block_on(store.resolve_session_if_needed()) {
                Some(u) => println!("{} <{}> role={} id={}", u.full_name, u.email, u.role, u.user_id),
                None => println!("not logged in"),
            },
            "open" => {
                let Some(path) = parts.next() else {
                    eprintln!("usage: open <path>");
                    continue;
                };
                router.navigate(&Destination::InApp(path.to_string()));
                // each visit mounts a fresh guard, as the console would
                let mut guard = RouteGuard::admin();
                rt.block_on(guard.evaluate(&store));
                match guard.render(&router) {
                    GuardView::Content(u) => println!("authorized: {} may view {}", u.username, path),
                    GuardView::Redirecting => println!("not authorized here; redirected"),
                    GuardView::Loading => println!("still checking"),
                }
            }
            "get" => {
                let Some(path) = parts.next() else {
                    eprintln!("usage: get <path>");
                    continue;
                };
                match rt.block_on(api.get_json::<serde_json::Value>(path)) {
                    Ok(v) => println!("{}", serde_json::to_string_pretty(&v).unwrap_or_else(|_| v.to_string())),
                    Err(e) => eprintln!("request failed: {}", e),
                }
            }
            "status" => {
                let snap = store.snapshot();
                println!("path:     {}", navigator.current_path());
                println!("loading:  {:?}", snap.loading);
                match snap.identity {
                    Some(u) => println!("identity: {} ({})", u.username, u.role),
                    None => println!("identity: none"),
                }
                println!("epoch:    {}", snap.epoch);
            }
            other => eprintln!("unknown command: {} (try 'help')", other),
        }
    }
    println!("bye");
    Ok(())
}
