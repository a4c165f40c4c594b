pub mod config {
    pub mod config_loader;
    pub mod config_model;
    pub mod stage;
}

pub mod services {
    pub mod sweep_loop;
}
