mod record_edit;
mod record_list;

pub use record_edit::RecordEditView;
pub use record_list::RecordListView;
