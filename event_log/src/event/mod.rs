pub mod event_kind;
pub mod mysql_event;

/// 没有关联后端时 host group 的哨兵值
pub const NO_HOSTGROUP_ID: u64 = u64::MAX;
