use alloy_primitives::{
    Address,
    B256,
    address,
    b256,
};
use sled::Db;
use std::path::Path;
use tokio::sync::{
    mpsc,
    oneshot,
};

const ADDR_PREFIX: &[u8] = b"addr/";
const TEXT_PREFIX: &[u8] = b"text/";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt record for key {key}: {reason}")]
    CorruptRecord { key: String, reason: &'static str },
    #[error("record store is not running")]
    Disconnected,
}

type Result<T> = std::result::Result<T, StoreError>;

/// Address and text records keyed by ENS namehash.
///
/// The sled handle cannot be shared between threads, so a `RecordDb` is used
/// directly only during setup. [`RecordDb::into_store`] hands it to a single
/// owner thread and returns a [`RecordStore`] that handlers can share.
pub struct RecordDb {
    db: Db<{ crate::LEAF_FANOUT }>,
}

impl std::fmt::Debug for RecordDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordDb").finish_non_exhaustive()
    }
}

impl RecordDb {
    pub fn open(path: &Path, cache_size: usize) -> Result<Self> {
        let db = sled::Config::new()
            .path(path)
            .cache_capacity_bytes(cache_size)
            .open()?;
        Ok(Self { db })
    }

    /// Database in a temporary directory that is removed on drop.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::tmp()?.open()?;
        Ok(Self { db })
    }

    pub fn set_addr(&self, namehash: B256, addr: Address) -> Result<()> {
        self.db.insert(addr_key(namehash), addr.to_vec())?;
        Ok(())
    }

    pub fn addr(&self, namehash: B256) -> Result<Option<Address>> {
        let Some(value) = self.db.get(addr_key(namehash))? else {
            return Ok(None);
        };
        if value.len() != 20 {
            return Err(StoreError::CorruptRecord {
                key: format!("addr/{namehash}"),
                reason: "address record is not 20 bytes",
            });
        }
        Ok(Some(Address::from_slice(&value)))
    }

    pub fn set_text(&self, namehash: B256, key: &str, value: &str) -> Result<()> {
        self.db
            .insert(text_key(namehash, key), value.as_bytes().to_vec())?;
        Ok(())
    }

    pub fn text(&self, namehash: B256, key: &str) -> Result<Option<String>> {
        let Some(value) = self.db.get(text_key(namehash, key))? else {
            return Ok(None);
        };
        String::from_utf8(value.to_vec())
            .map(Some)
            .map_err(|_| {
                StoreError::CorruptRecord {
                    key: format!("text/{namehash}/{key}"),
                    reason: "text record is not valid UTF-8",
                }
            })
    }

    /// Inserts a fixed set of demo records.
    pub fn seed_examples(&self) -> Result<()> {
        let first = b256!("0x0000000000000000000000000000000000000000000000000000000000000001");
        let second = b256!("0x0000000000000000000000000000000000000000000000000000000000000002");

        self.set_addr(first, address!("0x1111111111111111111111111111111111111111"))?;
        self.set_addr(second, address!("0x2222222222222222222222222222222222222222"))?;
        self.set_text(first, "email", "user@example.com")?;
        self.set_text(first, "url", "https://example.com")?;

        tracing::info!(records = 4, "Seeded example records");
        Ok(())
    }

    /// Moves the database onto its owner thread. The thread stops once every
    /// [`RecordStore`] clone has been dropped.
    pub fn into_store(self) -> Result<RecordStore> {
        let (tx, rx) = mpsc::unbounded_channel::<StoreRequest>();
        std::thread::Builder::new()
            .name("record-store".into())
            .spawn(move || listen_for_records(rx, self))?;
        tracing::debug!("Started record store thread");
        Ok(RecordStore { tx })
    }
}

/// Lookup sent to the owner thread, with the channel its answer goes back on.
#[derive(Debug)]
enum StoreRequest {
    Addr {
        namehash: B256,
        response: oneshot::Sender<Result<Option<Address>>>,
    },
    Text {
        namehash: B256,
        key: String,
        response: oneshot::Sender<Result<Option<String>>>,
    },
}

/// Serves lookups from the channel until every sender is gone.
fn listen_for_records(mut rx: mpsc::UnboundedReceiver<StoreRequest>, db: RecordDb) {
    while let Some(req) = rx.blocking_recv() {
        match req {
            StoreRequest::Addr { namehash, response } => {
                metrics::counter!("record_store_queries_total", "record" => "addr").increment(1);
                let _ = response.send(db.addr(namehash));
            }
            StoreRequest::Text {
                namehash,
                key,
                response,
            } => {
                metrics::counter!("record_store_queries_total", "record" => "text").increment(1);
                let _ = response.send(db.text(namehash, &key));
            }
        }
    }
    tracing::debug!("Record store thread stopped");
}

/// Cloneable handle to a [`RecordDb`] running on its owner thread.
///
/// Lookups block the calling thread until the owner answers, so they must not
/// be made from async code. The gateway runs handlers on blocking threads.
#[derive(Debug, Clone)]
pub struct RecordStore {
    tx: mpsc::UnboundedSender<StoreRequest>,
}

impl RecordStore {
    pub fn addr(&self, namehash: B256) -> Result<Option<Address>> {
        let (response, rx) = oneshot::channel();
        self.send(StoreRequest::Addr { namehash, response })?;
        rx.blocking_recv().map_err(|_| StoreError::Disconnected)?
    }

    pub fn text(&self, namehash: B256, key: &str) -> Result<Option<String>> {
        let (response, rx) = oneshot::channel();
        self.send(StoreRequest::Text {
            namehash,
            key: key.to_string(),
            response,
        })?;
        rx.blocking_recv().map_err(|_| StoreError::Disconnected)?
    }

    fn send(&self, req: StoreRequest) -> Result<()> {
        self.tx.send(req).map_err(|_| StoreError::Disconnected)
    }
}

fn addr_key(namehash: B256) -> Vec<u8> {
    [ADDR_PREFIX, namehash.as_slice()].concat()
}

fn text_key(namehash: B256, key: &str) -> Vec<u8> {
    [TEXT_PREFIX, namehash.as_slice(), b"/", key.as_bytes()].concat()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addr_records() {
        let db = RecordDb::temporary().unwrap();
        let node = B256::with_last_byte(7);

        assert_eq!(db.addr(node).unwrap(), None);
        db.set_addr(node, Address::repeat_byte(0xaa)).unwrap();
        assert_eq!(db.addr(node).unwrap(), Some(Address::repeat_byte(0xaa)));
    }

    #[test]
    fn test_text_records_are_scoped_by_node_and_key() {
        let db = RecordDb::temporary().unwrap();
        let node = B256::with_last_byte(1);

        db.set_text(node, "email", "a@b.c").unwrap();
        assert_eq!(db.text(node, "email").unwrap().as_deref(), Some("a@b.c"));
        assert_eq!(db.text(node, "url").unwrap(), None);
        assert_eq!(db.text(B256::with_last_byte(2), "email").unwrap(), None);
    }

    #[test]
    fn test_corrupt_addr_record() {
        let db = RecordDb::temporary().unwrap();
        let node = B256::with_last_byte(3);
        db.db.insert(addr_key(node), vec![1u8, 2, 3]).unwrap();

        assert!(matches!(
            db.addr(node),
            Err(StoreError::CorruptRecord { .. })
        ));
    }

    #[test]
    fn test_store_answers_through_owner_thread() {
        let db = RecordDb::temporary().unwrap();
        db.seed_examples().unwrap();
        let store = db.into_store().unwrap();

        assert_eq!(
            store.addr(B256::with_last_byte(2)).unwrap(),
            Some(Address::repeat_byte(0x22))
        );
        assert_eq!(store.addr(B256::with_last_byte(9)).unwrap(), None);
        assert_eq!(
            store.text(B256::with_last_byte(1), "url").unwrap().as_deref(),
            Some("https://example.com")
        );
    }

    #[test]
    fn test_concurrent_lookups() {
        let db = RecordDb::temporary().unwrap();
        db.seed_examples().unwrap();
        let store = db.into_store().unwrap();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16u8)
                .map(|i| {
                    let store = store.clone();
                    scope.spawn(move || {
                        let node = B256::with_last_byte(i % 2 + 1);
                        let expected = Address::repeat_byte(0x11 * (i % 2 + 1));
                        for _ in 0..50 {
                            assert_eq!(store.addr(node).unwrap(), Some(expected));
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
        });
    }

    #[test]
    fn test_stopped_store_is_disconnected() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let store = RecordStore { tx };

        assert!(matches!(
            store.addr(B256::ZERO),
            Err(StoreError::Disconnected)
        ));
    }
}
