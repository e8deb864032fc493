use platform_info::{InfoOptions, Platform, PlatformInfo};
use std::convert::Infallible;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    rt.block_on(async {
        let info = PlatformInfo::detect()?;
        println!("Detected platform: {}", info.platform());

        let form_factor = InfoOptions::new([Platform::Ios, Platform::Android], "desktop".to_string());
        let kind = info.get_sync(&|| Ok::<_, Infallible>("handset".to_string()), &form_factor)?;
        println!("Form factor: {}", kind);

        let build = InfoOptions::new([Platform::Linux, Platform::Macos], "unavailable".to_string())
            .with_memo_key("probe::kernel-build");
        let functions = info.functions(
            || async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, Infallible>(format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH))
            },
            || Ok::<_, Infallible>("sync-probe".to_string()),
            build,
        );
        println!("Build (async): {}", functions.get_async().await?);
        println!("Build (sync, memoized): {}", functions.get_sync()?);

        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
