use pbr_asteroid::{App, AssetPaths};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info,wgpu_core=warn,wgpu_hal=warn"))
        .init();

    // 可选参数：资源根目录，默认 ./data
    let assets = std::env::args().nth(1).map_or_else(AssetPaths::default, AssetPaths::new);

    if let Err(err) = App::new().with_assets(assets).run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}
