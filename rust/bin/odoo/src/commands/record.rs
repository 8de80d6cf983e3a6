//! Model record commands.
//!
//! `odoo search res.partner --fields name,email`, `odoo create res.partner --json '{...}'`, etc.

use std::path::Path;

use anyhow::Result;
use odoo_session::{SearchRead, SessionClient};
use serde_json::{Map, Value};

use super::open_client;

/// Open the client and require a stored session.
async fn authed_client(client_config_path: &Path) -> Result<SessionClient> {
    let client = open_client(client_config_path).await?;
    if !client.is_authenticated() {
        anyhow::bail!("Not logged in. Run `odoo login`.");
    }
    Ok(client)
}

/// Parse a JSON argument, naming the flag in the error.
pub fn parse_json(flag: &str, raw: &str) -> Result<Value> {
    serde_json::from_str(raw).map_err(|e| anyhow::anyhow!("Invalid JSON for --{}: {}", flag, e))
}

fn parse_kwargs(raw: Option<&str>) -> Result<Map<String, Value>> {
    match raw {
        None => Ok(Map::new()),
        Some(raw) => match parse_json("kwargs", raw)? {
            Value::Object(map) => Ok(map),
            other => anyhow::bail!("--kwargs must be a JSON object, got {}", other),
        },
    }
}

fn parse_args(raw: Option<&str>) -> Result<Vec<Value>> {
    match raw {
        None => Ok(Vec::new()),
        Some(raw) => match parse_json("args", raw)? {
            Value::Array(items) => Ok(items),
            other => anyhow::bail!("--args must be a JSON array, got {}", other),
        },
    }
}

/// Build the `search_read` query from CLI flags.
pub fn search_query(
    domain: Option<&str>,
    fields: Option<&str>,
    offset: Option<u64>,
    limit: Option<u64>,
    order: Option<&str>,
) -> Result<SearchRead> {
    let mut query = SearchRead::new();
    if let Some(raw) = domain {
        query = query.domain(parse_json("domain", raw)?);
    }
    if let Some(list) = fields {
        query = query.fields(list.split(',').map(str::trim).filter(|f| !f.is_empty()));
    }
    if let Some(n) = offset {
        query = query.offset(n);
    }
    if let Some(n) = limit {
        query = query.limit(n);
    }
    if let Some(o) = order {
        query = query.order(o);
    }
    Ok(query)
}

fn print(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn search(model: &str, query: SearchRead, client_config_path: &Path) -> Result<()> {
    let client = authed_client(client_config_path).await?;
    print(&client.search_read(model, query).await?)
}

pub async fn count(model: &str, domain: Option<&str>, client_config_path: &Path) -> Result<()> {
    let domain = domain.map(|d| parse_json("domain", d)).transpose()?.unwrap_or_else(|| Value::Array(Vec::new()));
    let client = authed_client(client_config_path).await?;
    print(&client.search_count(model, domain).await?)
}

pub async fn create(model: &str, json_body: &str, client_config_path: &Path) -> Result<()> {
    let data = parse_json("json", json_body)?;
    let client = authed_client(client_config_path).await?;
    let id = client.create(model, data).await?;
    println!("{} created: {}", model, id);
    Ok(())
}

pub async fn write(model: &str, id: i64, json_body: &str, client_config_path: &Path) -> Result<()> {
    let data = parse_json("json", json_body)?;
    let client = authed_client(client_config_path).await?;
    client.write(model, id, data).await?;
    println!("{} {} updated.", model, id);
    Ok(())
}

pub async fn unlink(model: &str, id: i64, client_config_path: &Path) -> Result<()> {
    let client = authed_client(client_config_path).await?;
    client.unlink(model, id).await?;
    println!("{} {} deleted.", model, id);
    Ok(())
}

pub async fn call(
    model: &str,
    method: &str,
    args: Option<&str>,
    kwargs: Option<&str>,
    client_config_path: &Path,
) -> Result<()> {
    let args = parse_args(args)?;
    let kwargs = parse_kwargs(kwargs)?;
    let client = authed_client(client_config_path).await?;
    print(&client.execute(model, method, args, kwargs).await?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_search_query_from_flags() {
        let q = search_query(
            Some(r#"[["is_company", "=", true]]"#),
            Some("name, email,"),
            Some(10),
            Some(5),
            Some("name asc"),
        )
        .unwrap();
        assert_eq!(
            q.to_args(80),
            vec![
                json!([["is_company", "=", true]]),
                json!(["name", "email"]),
                json!(10),
                json!(5),
                json!("name asc"),
            ]
        );

        let defaults = search_query(None, None, None, None, None).unwrap();
        assert_eq!(defaults, SearchRead::new());
    }

    #[test]
    fn test_bad_json_names_flag() {
        let err = search_query(Some("[oops"), None, None, None, None).unwrap_err();
        assert!(err.to_string().contains("--domain"));
    }

    #[test]
    fn test_args_and_kwargs_shapes() {
        assert_eq!(parse_args(Some("[[1, 2], {\"a\": 1}]")).unwrap().len(), 2);
        assert!(parse_args(Some("{}")).is_err());
        assert!(parse_args(None).unwrap().is_empty());
        assert_eq!(parse_kwargs(Some(r#"{"context": {}}"#)).unwrap().len(), 1);
        assert!(parse_kwargs(Some("[]")).is_err());
    }
}
