use {
    anyhow::{Context, Result},
    clap::Subcommand,
    inquire::Password,
    secrecy::Secret,
    triage_auth::{AuthClient, UserPublic},
    triage_config::TriageConfig,
};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Log in with email and password.
    Login {
        #[arg(long)]
        email: String,
        /// Password; prompted for with hidden input when omitted.
        #[arg(long, env = "TRIAGE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Show whether a credential is stored locally.
    Status,
    /// End the session and forget the stored credential.
    Logout,
    /// Show the user the stored credential belongs to.
    Whoami,
}

pub async fn handle_auth(client: &AuthClient, config: &TriageConfig, action: AuthAction) -> Result<()> {
    match action {
        AuthAction::Login { email, password } => login(client, &email, password).await,
        AuthAction::Status => status(client, config),
        AuthAction::Logout => logout(client).await,
        AuthAction::Whoami => whoami(client).await,
    }
}

async fn login(client: &AuthClient, email: &str, password: Option<String>) -> Result<()> {
    let password = resolve_password(password, prompt_password)?;

    let session = client.login(email, password).await?;
    println!("Logged in as {}", describe(&session.user));
    Ok(())
}

fn resolve_password(
    given: Option<String>,
    prompt: impl FnOnce() -> Result<String>,
) -> Result<Secret<String>> {
    let password = match given {
        Some(password) => password,
        None => prompt()?,
    };
    Ok(Secret::new(password))
}

fn prompt_password() -> Result<String> {
    Password::new("Password:")
        .without_confirmation()
        .prompt()
        .context("failed to read password")
}

fn status(client: &AuthClient, config: &TriageConfig) -> Result<()> {
    let path = triage_config::credentials_path(config);
    if client.is_authenticated() {
        println!("logged in (credential stored at {})", path.display());
    } else {
        println!("not logged in");
    }
    Ok(())
}

async fn logout(client: &AuthClient) -> Result<()> {
    if !client.is_authenticated() {
        println!("Not logged in");
        return Ok(());
    }
    client.logout().await?;
    println!("Logged out");
    Ok(())
}

async fn whoami(client: &AuthClient) -> Result<()> {
    if !client.is_authenticated() {
        anyhow::bail!("not logged in; run `triage auth login` first");
    }
    let user = client.me().await?;
    println!("{}", describe(&user));
    Ok(())
}

fn describe(user: &UserPublic) -> String {
    format!("{} <{}> ({:?})", user.name, user.email, user.role)
}
