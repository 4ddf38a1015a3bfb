//! Command handler for the RESP server

use std::fmt::Write as _;
use std::sync::Arc;

use modelcache::Error as CacheError;
use tracing::warn;

use crate::resp::Frame;
use crate::service::ModelRegistries;

/// Executes client commands against the registries
#[derive(Clone)]
pub struct CommandHandler {
    registries: Arc<ModelRegistries>,
}

impl CommandHandler {
    /// Handler over `registries`
    pub fn new(registries: Arc<ModelRegistries>) -> Self {
        Self { registries }
    }

    /// Execute one request frame and produce the reply
    pub async fn handle(&self, cmd: Frame) -> Frame {
        let args = match cmd {
            Frame::Array(Some(args)) if !args.is_empty() => args,
            _ => return Frame::err("invalid command format"),
        };

        let command = match args[0].as_bytes() {
            Some(name) => String::from_utf8_lossy(name).to_uppercase(),
            None => return Frame::err("invalid command"),
        };

        let args = &args[1..];
        match command.as_str() {
            "PING" => self.handle_ping(args),
            "ECHO" => self.handle_echo(args),
            "LOAD" => self.handle_load(args).await,
            "CACHED" => self.handle_cached(args),
            "NAMESPACES" => self.handle_namespaces(),
            "VARIANTS" => self.handle_variants(args),
            "KEYS" => self.handle_keys(),
            "INFO" => self.handle_info(),
            // redis-cli and client libraries send these on connect
            "COMMAND" => Frame::Array(Some(vec![])),
            "CLIENT" => Frame::ok(),
            _ => Frame::err(format!("unknown command '{}'", command)),
        }
    }

    fn handle_ping(&self, args: &[Frame]) -> Frame {
        match args {
            [] => Frame::Simple("PONG".to_string()),
            [message] => message.clone(),
            _ => wrong_arity("ping"),
        }
    }

    fn handle_echo(&self, args: &[Frame]) -> Frame {
        match args {
            [message] => message.clone(),
            _ => wrong_arity("echo"),
        }
    }

    async fn handle_load(&self, args: &[Frame]) -> Frame {
        let (namespace, variant) = match model_ref(args) {
            Some(pair) => pair,
            None => return wrong_arity("load"),
        };

        // Construction can take minutes; keep it off the reactor threads
        let registries = Arc::clone(&self.registries);
        let lookup = {
            let (namespace, variant) = (namespace.clone(), variant.clone());
            tokio::task::spawn_blocking(move || registries.get(&namespace, &variant)).await
        };

        match lookup {
            Ok(Ok(bundle)) => Frame::bulk_array(
                bundle
                    .parts()
                    .map(|(name, artifact)| format!("{}:{}", name, artifact.len())),
            ),
            Ok(Err(e)) => lookup_error(&e),
            Err(e) => {
                warn!(%namespace, %variant, error = %e, "model lookup task failed");
                Frame::err(format!("lookup of {}/{} aborted", namespace, variant))
            }
        }
    }

    fn handle_cached(&self, args: &[Frame]) -> Frame {
        let (namespace, variant) = match model_ref(args) {
            Some(pair) => pair,
            None => return wrong_arity("cached"),
        };

        let cached = self
            .registries
            .registry(&namespace)
            .map(|registry| registry.is_cached(&variant))
            .unwrap_or(false);
        Frame::Integer(i64::from(cached))
    }

    fn handle_namespaces(&self) -> Frame {
        Frame::bulk_array(self.registries.namespaces())
    }

    fn handle_variants(&self, args: &[Frame]) -> Frame {
        let namespace = match args {
            [ns] => match ns.as_bytes() {
                Some(ns) => String::from_utf8_lossy(ns).into_owned(),
                None => return Frame::err("invalid namespace"),
            },
            _ => return wrong_arity("variants"),
        };

        match self.registries.registry(&namespace) {
            Some(registry) => Frame::bulk_array(registry.variants()),
            None => Frame::Error(format!("BADREQ unknown namespace '{}'", namespace)),
        }
    }

    fn handle_keys(&self) -> Frame {
        let mut keys: Vec<String> = self
            .registries
            .caches()
            .iter()
            .flat_map(|cache| cache.cached_keys())
            .map(|key| key.to_string())
            .collect();
        keys.sort();
        Frame::bulk_array(keys)
    }

    fn handle_info(&self) -> Frame {
        let mut info = format!(
            "# Server\r\nmodeld_version:{}\r\nnamespaces:{}\r\n",
            env!("CARGO_PKG_VERSION"),
            self.registries.namespaces().count()
        );

        for cache in self.registries.caches() {
            let stats = cache.stats();
            let _ = write!(
                info,
                "\r\n# Cache {}\r\n\
                 size:{}\r\n\
                 capacity:{}\r\n\
                 hits:{}\r\n\
                 misses:{}\r\n\
                 coalesced:{}\r\n\
                 constructions:{}\r\n\
                 construction_failures:{}\r\n\
                 evictions:{}\r\n\
                 hit_ratio:{:.2}\r\n",
                cache.name(),
                cache.len(),
                cache.capacity(),
                stats.hits(),
                stats.misses(),
                stats.coalesced(),
                stats.constructions(),
                stats.failures(),
                stats.evictions(),
                stats.hit_ratio(),
            );
        }

        Frame::bulk(info)
    }
}

fn wrong_arity(command: &str) -> Frame {
    Frame::err(format!("wrong number of arguments for '{}' command", command))
}

fn model_ref(args: &[Frame]) -> Option<(String, String)> {
    match args {
        [namespace, variant] => Some((
            String::from_utf8_lossy(namespace.as_bytes()?).into_owned(),
            String::from_utf8_lossy(variant.as_bytes()?).into_owned(),
        )),
        _ => None,
    }
}

/// Client mistakes get `BADREQ`, server-side failures get `ERR`
fn lookup_error(e: &CacheError) -> Frame {
    if e.is_client_error() {
        Frame::Error(format!("BADREQ {}", e))
    } else {
        Frame::err(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::build_registries;
    use modelstore::format::encode_artifact;
    use modelstore::Manifest;
    use tempfile::TempDir;

    fn cmd(parts: &[&str]) -> Frame {
        Frame::bulk_array(parts.iter().copied())
    }

    fn handler(dir: &TempDir, capacity: usize) -> CommandHandler {
        std::fs::write(dir.path().join("pos-ko.bin"), encode_artifact(b"pos-ko")).unwrap();
        std::fs::write(dir.path().join("pos-en.bin"), encode_artifact(b"pos-en!")).unwrap();
        std::fs::write(dir.path().join("sa-a.bin"), encode_artifact(b"aa")).unwrap();
        std::fs::write(dir.path().join("sa-b.bin"), encode_artifact(b"bbb")).unwrap();

        let manifest = Manifest::parse(
            "pos ko pos-ko.bin\n\
             pos en pos-en.bin\n\
             sentiment ko shopping=sa-a.bin movie=sa-b.bin\n\
             ner en missing.bin\n",
            dir.path(),
        )
        .unwrap();
        CommandHandler::new(Arc::new(build_registries(&manifest, capacity)))
    }

    #[tokio::test]
    async fn test_ping() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir, 10);

        let resp = handler.handle(cmd(&["PING"])).await;
        assert_eq!(resp, Frame::Simple("PONG".to_string()));
    }

    #[tokio::test]
    async fn test_echo() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir, 10);

        let resp = handler.handle(cmd(&["echo", "hello"])).await;
        assert_eq!(resp, Frame::bulk("hello"));
    }

    #[tokio::test]
    async fn test_load_and_cached() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir, 10);

        assert_eq!(handler.handle(cmd(&["CACHED", "pos", "ko"])).await, Frame::Integer(0));

        let resp = handler.handle(cmd(&["LOAD", "pos", "ko"])).await;
        assert_eq!(resp, Frame::bulk_array(["default:6"]));

        assert_eq!(handler.handle(cmd(&["CACHED", "pos", "ko"])).await, Frame::Integer(1));
    }

    #[tokio::test]
    async fn test_load_multi_part() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir, 10);

        let resp = handler.handle(cmd(&["LOAD", "sentiment", "ko"])).await;
        assert_eq!(resp, Frame::bulk_array(["movie:3", "shopping:2"]));
    }

    #[tokio::test]
    async fn test_unsupported_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir, 10);

        for args in [["LOAD", "pos", "xx"], ["LOAD", "ocr", "ko"]] {
            match handler.handle(cmd(&args)).await {
                Frame::Error(msg) => assert!(msg.starts_with("BADREQ"), "{}", msg),
                other => panic!("unexpected reply {:?}", other),
            }
        }
        assert_eq!(handler.handle(cmd(&["KEYS"])).await, Frame::Array(Some(vec![])));
    }

    #[tokio::test]
    async fn test_construction_failure_is_server_error() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir, 10);

        match handler.handle(cmd(&["LOAD", "ner", "en"])).await {
            Frame::Error(msg) => assert!(msg.starts_with("ERR"), "{}", msg),
            other => panic!("unexpected reply {:?}", other),
        }
        assert_eq!(handler.handle(cmd(&["CACHED", "ner", "en"])).await, Frame::Integer(0));
    }

    #[tokio::test]
    async fn test_keys_follow_eviction() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir, 1);

        handler.handle(cmd(&["LOAD", "pos", "ko"])).await;
        handler.handle(cmd(&["LOAD", "pos", "en"])).await;

        assert_eq!(
            handler.handle(cmd(&["KEYS"])).await,
            Frame::bulk_array(["pos/en"])
        );
    }

    #[tokio::test]
    async fn test_namespaces_and_variants() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir, 10);

        assert_eq!(
            handler.handle(cmd(&["NAMESPACES"])).await,
            Frame::bulk_array(["ner", "pos", "sentiment"])
        );
        assert_eq!(
            handler.handle(cmd(&["VARIANTS", "pos"])).await,
            Frame::bulk_array(["en", "ko"])
        );
        assert!(matches!(
            handler.handle(cmd(&["VARIANTS", "ocr"])).await,
            Frame::Error(msg) if msg.starts_with("BADREQ")
        ));
    }

    #[tokio::test]
    async fn test_info_reports_stats() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir, 10);

        handler.handle(cmd(&["LOAD", "pos", "ko"])).await;
        handler.handle(cmd(&["LOAD", "pos", "ko"])).await;

        let info = match handler.handle(cmd(&["INFO"])).await {
            Frame::Bulk(Some(data)) => String::from_utf8(data).unwrap(),
            other => panic!("unexpected reply {:?}", other),
        };
        assert!(info.contains("# Cache default"));
        assert!(info.contains("hits:1\r\n"));
        assert!(info.contains("constructions:1\r\n"));
    }

    #[tokio::test]
    async fn test_wrong_arity_and_unknown() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir, 10);

        assert!(matches!(handler.handle(cmd(&["LOAD", "pos"])).await, Frame::Error(_)));
        assert!(matches!(handler.handle(cmd(&["FLUSHALL"])).await, Frame::Error(_)));
        assert!(matches!(handler.handle(Frame::Integer(1)).await, Frame::Error(_)));
    }
}
