use pmf_core::{Dashboard, DashboardConfig};

fn main() {
    pmf_core::init_logging();

    let config = match DashboardConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let dashboard = match Dashboard::open(&config) {
        Ok(dashboard) => dashboard,
        Err(e) => {
            eprintln!(
                "Error opening data directory '{}': {e}",
                config.data_dir.display()
            );
            std::process::exit(1);
        }
    };

    print!("{}", dashboard.leads_csv());
    dashboard.close();
}
