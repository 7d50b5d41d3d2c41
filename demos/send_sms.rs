use std::io;
use std::time::Duration;

use mengwang::{Credentials, Endpoint, LogSink, MengwangClient, SubPort};

fn required(name: &str) -> Result<String, io::Error> {
    std::env::var(name).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{name} environment variable is required"),
        )
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let wsdl = required("MENGWANG_WSDL")?;
    let user_id = required("MENGWANG_USER_ID")?;
    let password = required("MENGWANG_PASSWORD")?;
    let mobiles = required("MENGWANG_MOBILES")?;
    let sub_port = std::env::var("MENGWANG_SUB_PORT").unwrap_or_else(|_| "*".to_owned());
    let message = std::env::var("MENGWANG_MESSAGE")
        .unwrap_or_else(|_| "Hello from the mengwang demo.".to_owned());

    let mut builder =
        MengwangClient::builder(Credentials::new(user_id, password)?, SubPort::new(sub_port)?)
            .endpoint(Endpoint::wsdl(&wsdl)?)
            .timeout(Duration::from_secs(10))
            .logger(LogSink::new(|line| eprintln!("[mengwang] {line}")));
    if let Ok(proxy) = std::env::var("MENGWANG_PROXY") {
        builder = builder.proxy(proxy);
    }
    let client = builder.build()?;

    let mobiles = mobiles.split(',').map(str::to_owned).collect::<Vec<_>>();
    let response = client.send_text(mobiles, message).await?;
    println!("message_id: {}", response.message_id);

    Ok(())
}
