use clap::{Parser, ValueEnum};
use reqwest::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Method, StatusCode};

use request_gate::auth::basic;
use request_gate::auth::digest::{self, Challenge, DigestResponse, QuoteForDigest};

#[derive(Parser)]
#[command(name = "gate-cli")]
#[command(about = "Probe a request gate with Basic or Digest credentials", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8984")]
    url: String,

    /// Path (and query) to request.
    #[arg(short, long, default_value = "/")]
    path: String,

    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    #[arg(long, value_enum, default_value_t = Scheme::Basic)]
    scheme: Scheme,

    #[arg(long, default_value = "admin")]
    user: String,

    #[arg(long, default_value = "")]
    password: String,

    /// Request body.
    #[arg(short, long)]
    data: Option<String>,

    #[arg(long)]
    content_type: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Scheme {
    Basic,
    Digest,
    None,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let method = Method::from_bytes(cli.method.to_uppercase().as_bytes())?;
    let body = cli.data.clone().unwrap_or_default();

    let send = |authorization: Option<String>| {
        let mut request = client
            .request(method.clone(), format!("{}{}", cli.url, cli.path))
            .body(body.clone());
        if let Some(content_type) = &cli.content_type {
            request = request.header(reqwest::header::CONTENT_TYPE, content_type);
        }
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }
        request.send()
    };

    let response = match cli.scheme {
        Scheme::None => send(None).await?,
        Scheme::Basic => send(Some(format!("Basic {}", basic::encode(&cli.user, &cli.password)))).await?,
        Scheme::Digest => {
            let first = send(None).await?;
            if first.status() != StatusCode::UNAUTHORIZED {
                first
            } else {
                let challenge = first
                    .headers()
                    .get(WWW_AUTHENTICATE)
                    .and_then(|v| v.to_str().ok())
                    .and_then(Challenge::parse)
                    .ok_or("server did not offer a digest challenge")?;

                let ha1 = digest::ha1(&cli.user, &challenge.realm, &cli.password);
                let cnonce = digest::generate_cnonce();
                let qop = challenge.qop.first().copied();
                let response = DigestResponse {
                    ha1: &ha1,
                    algorithm: challenge.algorithm,
                    nonce: &challenge.nonce,
                    cnonce: &cnonce,
                    nc: "00000001",
                    qop,
                    method: method.as_str(),
                    uri: &cli.path,
                    body: body.as_bytes(),
                }
                .compute();

                let mut header = format!(
                    "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", algorithm={}, response=\"{}\"",
                    cli.user.quote_for_digest(),
                    challenge.realm.quote_for_digest(),
                    challenge.nonce,
                    cli.path.quote_for_digest(),
                    challenge.algorithm,
                    response
                );
                if let Some(qop) = qop {
                    header.push_str(&format!(", qop={}, nc=00000001, cnonce=\"{}\"", qop, cnonce));
                }
                send(Some(header)).await?
            }
        }
    };

    print_response(response).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let message = res
        .headers()
        .get("x-status-message")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: gate returned status {}", status);
        if let Some(message) = message {
            eprintln!("Message: {}", message);
        }
        eprintln!("Response: {}", text);
        return Ok(());
    }

    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
