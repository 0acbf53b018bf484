use {
    anyhow::{Context, Result},
    clap::Args,
    reqwest::Method,
    triage_auth::{AuthClient, OutgoingCall, Response},
};

#[derive(Args)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE).
    method: String,
    /// Path relative to the API base URL, e.g. `/incidents?page=2`.
    path: String,
    /// JSON request body.
    #[arg(long)]
    body: Option<String>,
}

pub async fn handle_request(client: &AuthClient, args: RequestArgs) -> Result<()> {
    let call = build_call(&args)?;
    let response = client.dispatcher().send(call).await?;
    print_response(&response);

    if response.is_exhausted_retry() {
        anyhow::bail!("still unauthorized after refreshing the credential");
    }
    if !response.is_success() {
        anyhow::bail!("request failed with HTTP {}", response.status());
    }
    Ok(())
}

fn build_call(args: &RequestArgs) -> Result<OutgoingCall> {
    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid HTTP method `{}`", args.method))?;
    let path = if args.path.starts_with('/') {
        args.path.clone()
    } else {
        format!("/{}", args.path)
    };

    let mut call = OutgoingCall::new(method, path);
    if let Some(raw) = &args.body {
        let body: serde_json::Value =
            serde_json::from_str(raw).context("--body must be valid JSON")?;
        call = call.with_json(body);
    }
    Ok(call)
}

fn print_response(response: &Response) {
    eprintln!("HTTP {}", response.status());
    if response.bytes().is_empty() {
        return;
    }
    match response.json::<serde_json::Value>() {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(pretty) => println!("{pretty}"),
            Err(_) => println!("{}", response.text()),
        },
        Err(_) => println!("{}", response.text()),
    }
}
