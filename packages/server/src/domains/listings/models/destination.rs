use std::fmt;

/// Where the listing table lands in the warehouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub project_id: String,
    pub dataset_id: String,
    pub table_name: String,
    /// Location the dataset is created in.
    pub region: String,
}

impl Destination {
    /// `project.dataset`
    pub fn dataset_path(&self) -> String {
        format!("{}.{}", self.project_id, self.dataset_id)
    }

    /// `project.dataset.table`
    pub fn table_path(&self) -> String {
        format!("{}.{}", self.dataset_path(), self.table_name)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.table_path())
    }
}
