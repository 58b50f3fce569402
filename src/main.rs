use std::io::Write;

use timezone_lookup::{AppError, ClientConfig, TimezoneClient, TimezoneQuery};
use tracing::{Instrument, error, info, span};
use tracing_subscriber::EnvFilter;

/// Initializes tracing, builds a client from the environment and reads lookups from stdin
/// until the user inputs "exit".
///
/// Accepted lines:
/// * `<lat> <lon> [timestamp] [language]` - look up a location and print the result as JSON
/// * `clear [identifier]` - drop one cache entry or the whole cache
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let client = TimezoneClient::new(ClientConfig::from_env()?)?;
    info!("Starting with {:?}", client.config());

    info!("Send `<lat> <lon> [timestamp] [language]`, `clear [identifier]` or `exit`");

    let mut buffer = String::new();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        buffer.clear();
        if std::io::stdin().read_line(&mut buffer)? == 0 {
            break;
        }

        let line = buffer.trim();
        if line == "exit" {
            break;
        }
        if line.is_empty() {
            continue;
        }

        handle_line(&client, line)
            .instrument(span!(tracing::Level::INFO, "request", line))
            .await;
    }

    Ok(())
}

async fn handle_line(client: &TimezoneClient, line: &str) {
    let mut words = line.split_whitespace();

    if words.clone().next() == Some("clear") {
        let identifier = words.nth(1);
        let cleared = client.clear_cache(identifier);
        info!("Cache cleared: {}", cleared);
        return;
    }

    let query = match parse_query(line) {
        Ok(query) => query,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };

    match client.lookup(&query).await {
        Ok(response) => {
            let map = serde_json::Value::Object(response.to_map(true));
            match serde_json::to_string_pretty(&map) {
                Ok(rendered) => println!("{rendered}"),
                Err(e) => error!("Failed to render response: {}", e),
            }
        }
        Err(e) => error!(kind = e.kind(), "{}", e),
    }
}

fn parse_query(line: &str) -> Result<TimezoneQuery, AppError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let (lat, lon, rest) = match words.as_slice() {
        [lat, lon, rest @ ..] if rest.len() <= 2 => (*lat, *lon, rest),
        _ => {
            return Err(AppError::InvalidConfig(
                "expected `<lat> <lon> [timestamp] [language]`".to_string(),
            ));
        }
    };

    let latitude = lat
        .trim_end_matches(',')
        .parse()
        .map_err(|_| AppError::InvalidConfig(format!("latitude `{lat}` is not a number")))?;
    let longitude = lon
        .parse()
        .map_err(|_| AppError::InvalidConfig(format!("longitude `{lon}` is not a number")))?;

    let mut query = TimezoneQuery::new(latitude, longitude);
    for word in rest {
        match word.parse::<i64>() {
            Ok(timestamp) => query = query.with_timestamp(timestamp),
            Err(_) => query = query.with_language(*word),
        }
    }

    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_line() {
        let query = parse_query("37.4224764 -122.0842499 1331161200 fr").unwrap();
        assert_eq!(
            query,
            TimezoneQuery::new(37.4224764, -122.0842499)
                .with_timestamp(1_331_161_200)
                .with_language("fr")
        );
    }

    #[test]
    fn parses_coordinates_only() {
        let query = parse_query("48.85, 2.35").unwrap();
        assert_eq!(query, TimezoneQuery::new(48.85, 2.35));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_query("paris").is_err());
        assert!(parse_query("north 2.35").is_err());
        assert!(parse_query("1 2 3 fr extra").is_err());
    }
}
