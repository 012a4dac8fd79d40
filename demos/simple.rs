use std::rc::Rc;
use std::time::SystemTime;

use tracing_subscriber::EnvFilter;
use tsumiki::*;

// Regular structs, stored in the container as opaque values

struct Logger {
    prefix: String,
}

impl Logger {
    fn log(&self, content: &str) {
        println!("{}{}", self.prefix, content);
    }
}

struct DateLogger {
    logger: Rc<Logger>,
}

impl DateLogger {
    fn log_date(&self) {
        let secs = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.logger.log(&format!("{}s since epoch", secs));
    }
}

fn logger(args: &Args, index: usize) -> Result<Rc<Logger>, WiringError> {
    args.get(index)
        .downcast::<Logger>()
        .ok_or_else(|| WiringError::opaque(anyhow::anyhow!("argument {index} is not a logger")))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), WiringError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let beans = Tsumiki::new();

    // Settings, filled through property registrations
    beans.register("settings", Creator::value(Value::map()), deps![])?;
    beans.register("settings.prefix", Creator::value("[demo] "), deps![])?;

    beans.register(
        "logger",
        Creator::factory(Function::sync(|args| {
            let prefix = args.get(0).as_str().unwrap_or_default().to_owned();
            Ok(Value::opaque(Logger { prefix }))
        })),
        deps!["settings.prefix"],
    )?;
    beans.register(
        "date_logger",
        Creator::constructor(Function::sync(|args| {
            Ok(Value::opaque(DateLogger {
                logger: logger(&args, 0)?,
            }))
        })),
        deps!["logger"],
    )?;

    // Patch the logger before anything is built, keeping the original one around
    beans.register(
        replacement("logger", Some("plain_logger")),
        Creator::factory(Function::future(|args: Args| async move {
            let plain = logger(&args, 0)?;
            Ok(Value::opaque(Logger {
                prefix: format!("{}(patched) ", plain.prefix),
            }))
        })),
        deps!["plain_logger"],
    )?;

    let date_logger = beans.get("date_logger").await?;
    if let Some(date_logger) = date_logger.downcast::<DateLogger>() {
        date_logger.log_date();
    }

    let settings = beans.get("settings").await?;
    println!("settings: {:?}", settings);

    Ok(())
}
