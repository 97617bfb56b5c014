//! Common Thrift sources for tests.

/// A complete, valid document. Expects `BaseService` from an include.
pub const ITEM_SERVICE: &str = r#"namespace java com.example.api
include "shared.thrift"

const i32 MAX_ITEMS = 100
const string DEFAULT_NAME = "anon"

typedef i64 Timestamp
typedef map<string, list<Item>> Index

enum Status {
  ACTIVE = 1,
  INACTIVE = 2,
  ARCHIVED = 0x10
}

/* Items are keyed by id.
   Tags are free-form. */
struct Item {
  1: required string id
  2: optional Timestamp created_at
  3: list<string> tags = []
  4: map<string, i32> counts = {"a": 1}
  5: Status status = Status.ACTIVE  // default state
  6: shared.Owner owner
}

exception NotFound {
  1: string message
}

service ItemService extends shared.BaseService {
  Item get(1: string id) throws (1: NotFound missing)
  list<Item> search(1: string query, 2: i32 limit = MAX_ITEMS)
  oneway void touch(1: string id)
}
"#;

/// One problem of every member-level kind, one per line.
pub const BROKEN_MEMBERS: &str = r#"enum Level {
  LOW = 1,
  HIGH = high
}

struct Record {
  1: string name
  1: string alias
  2: Missing ref
  3: i32 count = "many"
}

typedef Unknown Alias
"#;

pub const SHARED_TYPES: &str = r#"struct Point {
  1: double x
  2: double y
}

exception Oops {
  1: string reason
}

service BaseService {
  void ping()
}
"#;
