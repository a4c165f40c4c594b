pub mod domain {
    pub mod clock;

    pub mod entities {
        pub mod gateway_settings;
        pub mod payments;
        pub mod plan_resources;
        pub mod plans;
        pub mod resources;
        pub mod subscriptions;
    }

    pub mod repositories {
        pub mod gateway_settings;
        pub mod payment_gateway;
        pub mod payments;
        pub mod plan_resources;
        pub mod plans;
        pub mod resources;
        pub mod subscriptions;
    }

    pub mod value_objects {
        pub mod capabilities;
        pub mod payments;
        pub mod plans;
        pub mod resource_keys;
        pub mod subscriptions;
        pub mod sweeps;
        pub mod tiers;

        pub mod enums {
            pub mod billing_cycles;
            pub mod gateways;
            pub mod payment_statuses;
            pub mod plan_statuses;
            pub mod resource_types;
            pub mod roles;
            pub mod subscription_payment_statuses;
            pub mod subscription_statuses;
        }
    }
}

pub mod usecases {
    pub mod access_guard;
    pub mod billing_scheduler;
    pub mod entitlements;
    pub mod payment_orchestrator;
    pub mod payment_webhook;
    pub mod resource_catalog;
}

pub mod infra {
    pub mod db {
        pub mod postgres {
            pub mod postgres_connection;
            pub mod schema;
        }

        pub mod repositories {
            pub mod gateway_settings;
            pub mod payments;
            pub mod plan_resources;
            pub mod plans;
            pub mod resources;
            pub mod subscriptions;
        }
    }

    pub mod memory {
        pub mod billing_store;
    }
}

pub mod payments {
    pub mod mercado_pago_client;
    pub mod stripe_client;
}

pub mod observability;
