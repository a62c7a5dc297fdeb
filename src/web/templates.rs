use minijinja::{context, Environment};
use serde::Serialize;

use crate::auth::Actor;
use crate::db::models::Request;

/// HTML pages, compiled into the binary.
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new() -> anyhow::Result<Self> {
        let mut env = Environment::new();
        env.add_template("login.html", include_str!("../../templates/login.html"))?;
        env.add_template("dashboard.html", include_str!("../../templates/dashboard.html"))?;
        Ok(Self { env })
    }

    pub fn login(&self, error: Option<&str>) -> anyhow::Result<String> {
        let html = self
            .env
            .get_template("login.html")?
            .render(context! { error => error })?;
        Ok(html)
    }

    pub fn dashboard<F: Serialize>(
        &self,
        actor: &Actor,
        rows: &[Request],
        filters: &F,
    ) -> anyhow::Result<String> {
        let html = self.env.get_template("dashboard.html")?.render(context! {
            username => &actor.username,
            role => actor.role.as_str(),
            rows => rows,
            filters => filters,
        })?;
        Ok(html)
    }
}
