//! Command handler for the cachetree shell

use std::fmt;
use std::path::Path;

use cachetree::{CacheTree, Filter};
use serde_json::Value;

/// Reply to a single command line
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Command succeeded with nothing to report
    Ok,
    /// Simple status string
    Status(String),
    /// Count
    Integer(usize),
    /// Predicate result
    Bool(bool),
    /// JSON document
    Json(Value),
    /// Command failed
    Error(String),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ok => f.write_str("OK"),
            Reply::Status(s) => f.write_str(s),
            Reply::Integer(n) => write!(f, "{}", n),
            Reply::Bool(b) => write!(f, "{}", b),
            Reply::Json(v) => write!(f, "{}", v),
            Reply::Error(msg) => write!(f, "ERR {}", msg),
        }
    }
}

pub struct CommandHandler {
    cache: CacheTree,
}

impl CommandHandler {
    pub fn new(cache: CacheTree) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &CacheTree {
        &self.cache
    }

    /// Run one command line; blank lines and `#` comments yield `None`
    pub fn handle(&self, line: &str) -> Option<Reply> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let (command, args) = match line.split_once(char::is_whitespace) {
            Some((command, args)) => (command.to_uppercase(), args.trim()),
            None => (line.to_uppercase(), ""),
        };

        let reply = match command.as_str() {
            "PING" => self.handle_ping(args),
            "SET" => self.handle_set(args),
            "LOAD" => self.handle_load(args),
            "GET" => self.handle_get(args),
            "HAS" => self.handle_has(args),
            "DIFF" => self.handle_diff(args),
            "SIZE" => self.handle_size(args),
            "CLEAR" => self.handle_clear(args),
            "INFO" => self.handle_info(args),
            _ => Reply::Error(format!("unknown command '{}'", command)),
        };
        Some(reply)
    }

    fn handle_ping(&self, args: &str) -> Reply {
        if args.is_empty() {
            Reply::Status("PONG".to_string())
        } else {
            Reply::Status(args.to_string())
        }
    }

    fn handle_set(&self, args: &str) -> Reply {
        if args.is_empty() {
            return Reply::Error("wrong number of arguments for 'set' command".to_string());
        }

        let value: Value = match serde_json::from_str(args) {
            Ok(v) => v,
            Err(e) => return Reply::Error(format!("invalid JSON: {}", e)),
        };

        match self.cache.set_value(value) {
            Ok(count) => Reply::Integer(count),
            Err(e) => Reply::Error(e.to_string()),
        }
    }

    fn handle_load(&self, args: &str) -> Reply {
        if args.is_empty() {
            return Reply::Error("wrong number of arguments for 'load' command".to_string());
        }

        match load_file(&self.cache, Path::new(args)) {
            Ok(count) => Reply::Integer(count),
            Err(e) => Reply::Error(e.to_string()),
        }
    }

    fn handle_get(&self, args: &str) -> Reply {
        let filter = match parse(args) {
            Ok(filter) => filter,
            Err(reply) => return reply,
        };

        let records = self.cache.get(&filter);
        Reply::Json(Value::Array(records.into_iter().map(Value::Object).collect()))
    }

    fn handle_has(&self, args: &str) -> Reply {
        if args.is_empty() {
            return Reply::Error("wrong number of arguments for 'has' command".to_string());
        }
        match parse(args) {
            Ok(filter) => Reply::Bool(self.cache.has(&filter)),
            Err(reply) => reply,
        }
    }

    fn handle_diff(&self, args: &str) -> Reply {
        if args.is_empty() {
            return Reply::Error("wrong number of arguments for 'diff' command".to_string());
        }
        let filter = match parse(args) {
            Ok(filter) => filter,
            Err(reply) => return reply,
        };

        match self.cache.get_diff(&filter) {
            Ok(diff) => match serde_json::to_value(&diff) {
                Ok(v) => Reply::Json(v),
                Err(e) => Reply::Error(e.to_string()),
            },
            Err(e) => Reply::Error(e.to_string()),
        }
    }

    fn handle_size(&self, _args: &str) -> Reply {
        Reply::Integer(self.cache.get_size())
    }

    fn handle_clear(&self, _args: &str) -> Reply {
        self.cache.clear_cache();
        Reply::Ok
    }

    fn handle_info(&self, _args: &str) -> Reply {
        let stats = self.cache.stats().snapshot();
        Reply::Json(serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "fields": self.cache.fields(),
            "capacity": self.cache.capacity(),
            "size": self.cache.get_size(),
            "stats": stats,
        }))
    }
}

/// Text filter, or a JSON object when the argument starts with `{`
fn parse(args: &str) -> Result<Filter, Reply> {
    let parsed = if args.starts_with('{') {
        serde_json::from_str(args).map_err(|e| e.to_string())
    } else {
        args.parse::<Filter>().map_err(|e| e.to_string())
    };
    parsed.map_err(|msg| Reply::Error(format!("invalid filter: {}", msg)))
}

/// Insert the record(s) stored as JSON in `path`
pub fn load_file(cache: &CacheTree, path: &Path) -> anyhow::Result<usize> {
    let text = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&text)?;
    Ok(cache.set_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn handler() -> CommandHandler {
        let cache = CacheTree::new(["sex", "estimate", "age"]).unwrap();
        CommandHandler::new(cache)
    }

    fn run(handler: &CommandHandler, line: &str) -> Reply {
        handler.handle(line).unwrap()
    }

    #[test]
    fn test_ping() {
        let handler = handler();

        assert_eq!(run(&handler, "PING"), Reply::Status("PONG".to_string()));
        assert_eq!(run(&handler, "ping hello"), Reply::Status("hello".to_string()));
    }

    #[test]
    fn test_blank_and_comment() {
        let handler = handler();

        assert_eq!(handler.handle("   "), None);
        assert_eq!(handler.handle("# warm up"), None);
    }

    #[test]
    fn test_set_and_get() {
        let handler = handler();

        let reply = run(
            &handler,
            r#"SET [{"sex":1,"estimate":1,"age":1},{"sex":1,"estimate":2,"age":1}]"#,
        );
        assert_eq!(reply, Reply::Integer(2));

        let reply = run(&handler, "GET sex=1 age=1");
        assert_eq!(
            reply,
            Reply::Json(json!([
                {"sex": 1, "estimate": 1, "age": 1},
                {"sex": 1, "estimate": 2, "age": 1},
            ]))
        );
        assert_eq!(run(&handler, "SIZE"), Reply::Integer(2));
    }

    #[test]
    fn test_has_and_diff() {
        let handler = handler();
        run(&handler, r#"SET {"sex":1,"estimate":1,"age":1}"#);

        assert_eq!(run(&handler, "HAS sex=1;estimate=1;age=1"), Reply::Bool(true));
        assert_eq!(run(&handler, "HAS sex=1;estimate=1;age=1,2"), Reply::Bool(false));

        let reply = run(&handler, "DIFF sex=1 estimate=1 age=[1,2,3]");
        assert_eq!(reply, Reply::Json(json!({"sex": 1, "estimate": 1, "age": [2, 3]})));
        assert_eq!(reply.to_string(), r#"{"age":[2,3],"estimate":1,"sex":1}"#);

        let reply = run(&handler, r#"DIFF {"sex":1,"estimate":1,"age":1}"#);
        assert_eq!(reply, Reply::Json(json!({})));
    }

    #[test]
    fn test_errors() {
        let handler = handler();

        assert!(matches!(run(&handler, "FROB"), Reply::Error(_)));
        assert!(matches!(run(&handler, "SET not json"), Reply::Error(_)));
        assert!(matches!(run(&handler, "SET 5"), Reply::Error(_)));
        assert!(matches!(run(&handler, "GET sex=[1"), Reply::Error(_)));
        assert!(matches!(run(&handler, "DIFF sex=1"), Reply::Error(_)));
        assert_eq!(
            run(&handler, "DIFF sex=1").to_string(),
            "ERR Filter is missing field: estimate"
        );
    }

    #[test]
    fn test_load_and_clear() {
        let handler = handler();
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"sex":2,"estimate":1,"age":1}},{{"sex":2,"estimate":1,"age":2}}]"#
        )
        .unwrap();

        let reply = run(&handler, &format!("LOAD {}", file.path().display()));
        assert_eq!(reply, Reply::Integer(2));
        assert_eq!(handler.cache().get_size(), 2);

        assert_eq!(run(&handler, "CLEAR"), Reply::Ok);
        assert_eq!(run(&handler, "SIZE"), Reply::Integer(0));
        assert!(matches!(run(&handler, "LOAD /nonexistent/records.json"), Reply::Error(_)));
    }

    #[test]
    fn test_info() {
        let handler = handler();
        run(&handler, r#"SET {"sex":1,"estimate":1,"age":1}"#);
        run(&handler, "GET sex=1");

        let Reply::Json(info) = run(&handler, "INFO") else {
            panic!("expected JSON reply");
        };
        assert_eq!(info["size"], json!(1));
        assert_eq!(info["fields"], json!(["sex", "estimate", "age"]));
        assert_eq!(info["capacity"], Value::Null);
        assert_eq!(info["stats"]["hits"], json!(1));
        assert_eq!(info["stats"]["inserts"], json!(1));
    }
}
