use std::io;

use mengwang::{Credentials, Endpoint, MengwangClient, SubPort};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let var = |name: &str| {
        std::env::var(name).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{name} environment variable is required"),
            )
        })
    };

    let client = MengwangClient::builder(
        Credentials::new(var("MENGWANG_USER_ID")?, var("MENGWANG_PASSWORD")?)?,
        SubPort::any(),
    )
    .endpoint(Endpoint::wsdl(&var("MENGWANG_WSDL")?)?)
    .build()?;

    let response = client.query_report().await?;
    for report in &response.reports {
        println!(
            "{} {} {} {} {}",
            report.report_time, report.message_id, report.mobile, report.status_code, report.status
        );
    }
    if !response.malformed.is_empty() {
        println!("skipped {} malformed record(s)", response.malformed.len());
    }

    Ok(())
}
