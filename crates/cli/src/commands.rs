//! CLI commands

use anyhow::{Context as _, Result, bail};
use clap::Subcommand;
use portal_core::{
    GuardDecision, PortalConfig, RouteGuard, StateDir,
    guard::require_session,
    validation::{
        Field, FieldErrors, ForgotPasswordForm, LoginForm, PasswordStrength, ResetPasswordForm,
        SignupForm,
    },
};
use portal_session::{
    AuthProvider, AuthenticatedRequester, FileStorage, RequestOptions, SchedulerState,
    SessionError, SessionStorage, SessionStore,
};
use reqwest::Method;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tracing::info;

use crate::config;

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(long, env = "PORTAL_EMAIL")]
        email: String,

        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account (does not sign in)
    Signup {
        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(long)]
        email: String,

        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long)]
        confirm_password: String,
    },

    /// Sign out and forget the persisted session
    Logout,

    /// Exchange the refresh token for a new token pair
    Refresh,

    /// Send a password reset email
    ForgotPassword {
        #[arg(long)]
        email: String,
    },

    /// Set a new password with the token from the reset email
    ResetPassword {
        #[arg(long)]
        token: String,

        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long)]
        confirm_password: String,
    },

    /// Revoke every token issued to the current user
    RevokeAll,

    /// Fetch the current user's profile
    Whoami,

    /// Show the persisted session
    Status,

    /// Evaluate the route guard for a path against the persisted session
    Guard {
        /// Request path, e.g. /dashboard
        path: String,
    },

    /// Send an authenticated request to the API, refreshing once on 401
    Api {
        /// Endpoint relative to the API base URL, e.g. /api/v1/users/me
        endpoint: String,

        #[arg(short = 'X', long, default_value = "GET", value_parser = parse_method)]
        method: Method,

        /// JSON request body
        #[arg(long)]
        body: Option<String>,

        /// Send without the bearer token
        #[arg(long)]
        public: bool,
    },

    /// Keep the session fresh in the background until interrupted
    Keepalive,

    /// Run the edge server: route guard, /api rewrite and static assets
    Serve {
        /// Bind address (overrides server.bind_addr)
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Static asset directory (overrides server.static_dir)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Configuration file management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write the default configuration file
    Generate {
        /// Output file path (defaults to <data_dir>/config/portal.json)
        output: Option<PathBuf>,
    },

    /// Print the effective configuration
    Show,
}

fn parse_method(value: &str) -> Result<Method, String> {
    value
        .to_ascii_uppercase()
        .parse()
        .map_err(|e| format!("invalid HTTP method: {e}"))
}

/// What every command needs: configuration and where state lives
struct Context {
    config: PortalConfig,
    state_dir: StateDir,
}

impl Context {
    fn storage(&self) -> FileStorage {
        FileStorage::for_key(&self.state_dir, &self.config.session.storage_key)
    }

    fn store(&self) -> Result<SessionStore> {
        let storage: Arc<dyn SessionStorage> = Arc::new(self.storage());
        Ok(SessionStore::from_config(&self.config, storage)?)
    }

    fn requester(&self, store: SessionStore) -> Result<AuthenticatedRequester> {
        Ok(AuthenticatedRequester::from_config(&self.config.api, store)?)
    }
}

impl Commands {
    /// Component name used for the log file
    pub const fn component(&self) -> &'static str {
        match self {
            Self::Serve { .. } => "server",
            Self::Keepalive => "keepalive",
            _ => "cli",
        }
    }

    pub const fn is_long_running(&self) -> bool {
        matches!(self, Self::Serve { .. } | Self::Keepalive)
    }

    const fn needs_config(&self) -> bool {
        !matches!(
            self,
            Self::Config {
                command: ConfigCommands::Generate { .. }
            }
        )
    }

    pub async fn execute(self, config_file: Option<PathBuf>, state_dir: StateDir) -> Result<()> {
        let config = if self.needs_config() {
            config::load_config(config_file.as_deref(), &state_dir)?
        } else {
            PortalConfig::default()
        };
        let ctx = Context { config, state_dir };

        match self {
            Self::Login { email, password } => login(&ctx, email, password).await,
            Self::Signup {
                first_name,
                last_name,
                email,
                password,
                confirm_password,
            } => {
                let form = SignupForm {
                    first_name,
                    last_name,
                    email,
                    password,
                    confirm_password,
                };
                signup(&ctx, form).await
            }
            Self::Logout => {
                ctx.store()?.logout().await;
                println!("Signed out");
                Ok(())
            }
            Self::Refresh => refresh(&ctx).await,
            Self::ForgotPassword { email } => forgot_password(&ctx, email).await,
            Self::ResetPassword {
                token,
                password,
                confirm_password,
            } => {
                let form = ResetPasswordForm {
                    token,
                    password,
                    confirm_password,
                };
                reset_password(&ctx, form).await
            }
            Self::RevokeAll => {
                let store = ctx.store()?;
                ensure_session(&store)?;
                store.revoke_all_tokens().await;
                println!("All tokens revoked; signed out everywhere");
                Ok(())
            }
            Self::Whoami => whoami(&ctx).await,
            Self::Status => status(&ctx),
            Self::Guard { path } => guard(&ctx, &path),
            Self::Api {
                endpoint,
                method,
                body,
                public,
            } => api(&ctx, &endpoint, method, body, public).await,
            Self::Keepalive => keepalive(&ctx).await,
            Self::Serve { bind, static_dir } => serve(ctx, bind, static_dir).await,
            Self::Config {
                command: ConfigCommands::Generate { output },
            } => {
                let path = config::generate_default_config(output, &ctx.state_dir)?;
                println!("Generated configuration at: {}", path.display());
                Ok(())
            }
            Self::Config {
                command: ConfigCommands::Show,
            } => {
                println!("{}", serde_json::to_string_pretty(&ctx.config)?);
                Ok(())
            }
        }
    }
}

fn print_field_errors(errors: &FieldErrors) {
    for (field, message) in errors.iter() {
        eprintln!("  {}: {message}", field.as_str());
    }
}

fn invalid(errors: FieldErrors) -> anyhow::Error {
    print_field_errors(&errors);
    SessionError::Validation(errors).into()
}

fn ensure_session(store: &SessionStore) -> Result<()> {
    let state = store.state();
    if !require_session(state.is_authenticated, state.tokens.as_ref()) {
        bail!("Not signed in. Run `portal login` first.");
    }
    Ok(())
}

async fn login(ctx: &Context, email: String, password: String) -> Result<()> {
    let form = LoginForm { email, password };
    form.validate().map_err(invalid)?;

    let store = ctx.store()?;
    store.login(&form.email, &form.password).await?;

    match store.user() {
        Some(user) => println!("Signed in as {} <{}>", user.display_name(), user.email),
        None => println!("Signed in"),
    }
    info!(landing = %ctx.config.guard.landing_path, "Login complete");
    Ok(())
}

async fn signup(ctx: &Context, form: SignupForm) -> Result<()> {
    if let Err(errors) = form.validate() {
        if errors.get(Field::Password).is_some() {
            for (requirement, met) in PasswordStrength::of(&form.password).checklist() {
                eprintln!("  [{}] {requirement}", if met { "x" } else { " " });
            }
        }
        return Err(invalid(errors));
    }

    let data = form.into_register_data().map_err(invalid)?;
    ctx.store()?.register(&data).await?;

    println!("Registration successful! Please sign in.");
    Ok(())
}

async fn refresh(ctx: &Context) -> Result<()> {
    let store = ctx.store()?;
    ensure_session(&store)?;
    store.refresh_token().await?;

    if let Some(tokens) = store.tokens() {
        println!("Tokens refreshed; expires in {}s", tokens.expires_in);
    }
    Ok(())
}

async fn forgot_password(ctx: &Context, email: String) -> Result<()> {
    let form = ForgotPasswordForm { email };
    form.validate().map_err(invalid)?;

    ctx.store()?.forgot_password(&form.email).await?;
    println!("Check your email: if an account exists for {}, a reset link is on its way", form.email);
    Ok(())
}

async fn reset_password(ctx: &Context, form: ResetPasswordForm) -> Result<()> {
    form.validate().map_err(invalid)?;

    ctx.store()?
        .reset_password(&form.token, &form.password)
        .await?;
    println!("Password reset successful. You can now sign in with your new password.");
    Ok(())
}

async fn whoami(ctx: &Context) -> Result<()> {
    let store = ctx.store()?;
    ensure_session(&store)?;

    let endpoint = format!("{}/users/me", ctx.config.api.prefix.trim_end_matches('/'));
    let user: portal_core::User = ctx
        .requester(store)?
        .request_json(&endpoint, RequestOptions::default())
        .await?;

    println!("{}", serde_json::to_string_pretty(&user)?);
    Ok(())
}

fn status(ctx: &Context) -> Result<()> {
    let storage = ctx.storage();
    let store = ctx.store()?;
    let state = store.state();

    println!("storage:       {}", storage.path().display());
    println!("api:           {}", ctx.config.api.endpoint_base());
    println!("authenticated: {}", state.is_authenticated);
    match &state.user {
        Some(user) => println!("user:          {} <{}>", user.display_name(), user.email),
        None => println!("user:          -"),
    }
    match &state.tokens {
        Some(tokens) => println!(
            "tokens:        {} (expires_in {}s)",
            tokens.token_type, tokens.expires_in
        ),
        None => println!("tokens:        -"),
    }
    Ok(())
}

fn guard(ctx: &Context, path: &str) -> Result<()> {
    let guard = RouteGuard::new(ctx.config.guard.clone());
    let persisted = ctx
        .storage()
        .load()
        .context("Failed to read persisted session")?;

    match guard.evaluate(path, persisted.as_deref()) {
        GuardDecision::Allow => println!("allow {path}"),
        GuardDecision::Redirect(to) => println!("redirect {path} -> {to}"),
    }
    Ok(())
}

async fn api(
    ctx: &Context,
    endpoint: &str,
    method: Method,
    body: Option<String>,
    public: bool,
) -> Result<()> {
    let store = ctx.store()?;
    let mut options = RequestOptions::new(method);
    if let Some(body) = body {
        serde_json::from_str::<serde_json::Value>(&body).context("--body must be JSON")?;
        options = options.body(body);
    }
    if public {
        options = options.public();
    }

    let response = ctx.requester(store)?.request(endpoint, options).await?;
    let status = response.status();
    let text = response.text().await.context("Failed to read response body")?;

    println!("{status}");
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) if text.is_empty() => {}
        Err(_) => println!("{text}"),
    }

    if !status.is_success() {
        bail!("Request failed with status {status}");
    }
    Ok(())
}

async fn keepalive(ctx: &Context) -> Result<()> {
    let store = ctx.store()?;
    ensure_session(&store)?;

    let provider = AuthProvider::mount(store, &ctx.config.session).await;
    ensure_session(provider.store())?;

    let mut states = provider.scheduler().subscribe();
    println!("Keeping session alive; press Ctrl-C to stop");

    let session_ended = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                break false;
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break false;
                }
                let state = *states.borrow_and_update();
                match state {
                    SchedulerState::Scheduled { delay } => {
                        info!(delay_secs = delay.as_secs(), "Next refresh scheduled");
                    }
                    SchedulerState::Firing => info!("Refreshing tokens"),
                    SchedulerState::Idle if !provider.store().is_authenticated() => break true,
                    SchedulerState::Idle => {}
                }
            }
        }
    };

    provider.unmount();

    if session_ended {
        bail!("Session ended; sign in again");
    }
    println!("Stopped");
    Ok(())
}

async fn serve(
    mut ctx: Context,
    bind: Option<SocketAddr>,
    static_dir: Option<PathBuf>,
) -> Result<()> {
    if let Some(bind) = bind {
        ctx.config.server.bind_addr = bind;
    }
    if static_dir.is_some() {
        ctx.config.server.static_dir = static_dir;
    }
    ctx.config.validate()?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
        }
    };

    portal_http::serve(&ctx.config, shutdown).await?;
    Ok(())
}
