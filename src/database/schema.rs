//! Schema data structures
//!
//! This module defines the static bookstore schema: its tables, columns,
//! and key relationships, plus the DDL rendered from them.

use std::collections::BTreeSet;
use std::fmt;

/// Represents the type of a database column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnType {
    /// The base type (e.g., "varchar", "int", "datetime")
    pub base_type: String,
    /// Optional length/precision (e.g., 50 for varchar(50))
    pub length: Option<u32>,
    /// Optional scale for decimal types
    pub scale: Option<u32>,
}

impl ColumnType {
    fn plain(base_type: &str) -> Self {
        Self {
            base_type: base_type.to_string(),
            length: None,
            scale: None,
        }
    }

    /// `varchar(n)`
    pub fn varchar(length: u32) -> Self {
        Self {
            base_type: "varchar".to_string(),
            length: Some(length),
            scale: None,
        }
    }

    /// `int`
    pub fn int() -> Self {
        Self::plain("int")
    }

    /// `date`
    pub fn date() -> Self {
        Self::plain("date")
    }

    /// `datetime`
    pub fn datetime() -> Self {
        Self::plain("datetime")
    }

    /// `DECIMAL(precision,scale)`
    pub fn decimal(precision: u32, scale: u32) -> Self {
        Self {
            base_type: "DECIMAL".to_string(),
            length: Some(precision),
            scale: Some(scale),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_type)?;
        if let Some(len) = self.length {
            write!(f, "({}", len)?;
            if let Some(scale) = self.scale {
                write!(f, ",{}", scale)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Represents a column in a database table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Column data type
    pub column_type: ColumnType,
    /// Whether the column is nullable
    pub nullable: bool,
}

impl Column {
    /// A nullable column
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            nullable: true,
        }
    }

    /// A NOT NULL column
    pub fn required(name: &str, column_type: ColumnType) -> Self {
        Self {
            nullable: false,
            ..Self::new(name, column_type)
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.column_type)?;
        if !self.nullable {
            write!(f, " NOT NULL")?;
        }
        Ok(())
    }
}

/// Foreign key reference information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyReference {
    /// Referencing column in the owning table
    pub column: String,
    /// Referenced table name
    pub table: String,
    /// Referenced column name
    pub referenced_column: String,
}

impl fmt::Display for ForeignKeyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FOREIGN KEY ({}) REFERENCES {}({})",
            self.column, self.table, self.referenced_column
        )
    }
}

/// Represents a database table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Table name
    pub name: String,
    /// Table columns, in declared order
    pub columns: Vec<Column>,
    /// Primary key columns (ordered)
    pub primary_keys: Vec<String>,
    /// Foreign key relationships
    pub foreign_keys: Vec<ForeignKeyReference>,
}

impl Table {
    /// Create a new table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_keys: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Add a column to the table
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Set the primary key columns
    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_keys = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Add a foreign key `column -> table(referenced_column)`
    pub fn references(mut self, column: &str, table: &str, referenced_column: &str) -> Self {
        self.foreign_keys.push(ForeignKeyReference {
            column: column.to_string(),
            table: table.to_string(),
            referenced_column: referenced_column.to_string(),
        });
        self
    }

    /// Get a column by name
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Render the `CREATE TABLE` statement for this table.
    ///
    /// The output avoids trailing commas and vendor types so that SQL Server,
    /// SQLite and MySQL all accept it.
    pub fn create_statement(&self) -> String {
        let mut parts: Vec<String> = self.columns.iter().map(|c| format!("\t{}", c)).collect();

        if !self.primary_keys.is_empty() {
            parts.push(format!("\tPRIMARY KEY ({})", self.primary_keys.join(", ")));
        }
        for fk in &self.foreign_keys {
            parts.push(format!("\t{}", fk));
        }

        format!("CREATE TABLE {} (\n{}\n);", self.name, parts.join(",\n"))
    }
}

/// The complete set of tables, kept in creation order
#[derive(Debug, Clone)]
pub struct Schema {
    /// Tables; each one appears after every table it references
    pub tables: Vec<Table>,
}

impl Schema {
    /// The bookstore-retail schema
    pub fn bookstore() -> Self {
        use ColumnType as T;

        let tables = vec![
            Table::new("employees")
                .column(Column::new("EID", T::varchar(5)))
                .column(Column::new("Name", T::varchar(50)))
                .column(Column::new("salary", T::int()))
                .primary_key(&["EID"]),
            Table::new("customers")
                .column(Column::new("CID", T::varchar(5)))
                .column(Column::new("Name", T::varchar(50)))
                .primary_key(&["CID"]),
            Table::new("bookstore")
                .column(Column::new("BID", T::varchar(5)))
                .primary_key(&["BID"]),
            Table::new("publication")
                .column(Column::new("PubID", T::varchar(5)))
                .column(Column::new("publisher", T::varchar(40)))
                .column(Column::new("year", T::int()))
                .primary_key(&["PubID"]),
            Table::new("magazines")
                .column(Column::new("PubID", T::varchar(5)))
                .column(Column::new("issue", T::varchar(20)))
                .column(Column::new("title", T::varchar(50)))
                .references("PubID", "publication", "PubID"),
            Table::new("books")
                .column(Column::new("PubID", T::varchar(5)))
                .column(Column::new("title", T::varchar(50)))
                .references("PubID", "publication", "PubID"),
            Table::new("orders")
                .column(Column::required("OrderID", T::varchar(5)))
                .column(Column::required("date_time", T::datetime()))
                .column(Column::required("shipping_address", T::varchar(20)))
                .column(Column::required("CID", T::varchar(5)))
                .primary_key(&["OrderID"])
                .references("CID", "customers", "CID"),
            Table::new("complaints")
                .column(Column::required("complaintID", T::varchar(5)))
                .column(Column::required("EID", T::varchar(5)))
                .column(Column::required("CID", T::varchar(5)))
                .column(Column::required("filed_date_time", T::datetime()))
                .column(Column::required("Text", T::varchar(100)))
                .column(Column::required("handled_date_time", T::datetime()))
                .primary_key(&["complaintID"])
                .references("EID", "employees", "EID")
                .references("CID", "customers", "CID"),
            Table::new("complaints_on_bookstore")
                .column(Column::new("complaintID", T::varchar(5)))
                .column(Column::new("BID", T::varchar(5)))
                .primary_key(&["complaintID", "BID"])
                .references("complaintID", "complaints", "complaintID")
                .references("BID", "bookstore", "BID"),
            Table::new("complaints_on_orders")
                .column(Column::new("complaintID", T::varchar(5)))
                .column(Column::new("orderID", T::varchar(5)))
                .primary_key(&["complaintID", "orderID"])
                .references("complaintID", "complaints", "complaintID")
                .references("orderID", "orders", "OrderID"),
            Table::new("complaint_status")
                .column(Column::new("date", T::date()))
                .column(Column::new("complaintID", T::varchar(5)))
                .column(Column::new("state", T::varchar(15)))
                .primary_key(&["date", "complaintID"])
                .references("complaintID", "complaints", "complaintID"),
            Table::new("stocks_in_bookstore")
                .column(Column::required("stockID", T::varchar(5)))
                .column(Column::required("BID", T::varchar(5)))
                .column(Column::required("PubID", T::varchar(5)))
                .column(Column::required("stock_qty", T::int()))
                .column(Column::required("stock_price", T::decimal(5, 2)))
                .primary_key(&["stockID"])
                .references("BID", "bookstore", "BID")
                .references("PubID", "publication", "PubID"),
            Table::new("price_history")
                .column(Column::required("stockID", T::varchar(5)))
                .column(Column::required("BID", T::varchar(5)))
                .column(Column::required("PubID", T::varchar(5)))
                .column(Column::required("start_date", T::date()))
                .column(Column::new("end_date", T::date()))
                .column(Column::required("price", T::decimal(5, 2)))
                .primary_key(&["BID", "stockID", "PubID", "start_date", "end_date", "price"])
                .references("stockID", "stocks_in_bookstore", "stockID")
                .references("BID", "bookstore", "BID")
                .references("PubID", "publication", "PubID"),
            Table::new("items_in_orders")
                .column(Column::new("itemID", T::varchar(5)))
                .column(Column::new("BID", T::varchar(5)))
                .column(Column::new("stockID", T::varchar(5)))
                .column(Column::new("PubID", T::varchar(5)))
                .column(Column::new("orderID", T::varchar(5)))
                .column(Column::new("item_price", T::decimal(5, 2)))
                .column(Column::new("item_qty", T::int()))
                .column(Column::new("Delivery_date", T::date()))
                .column(Column::new("Comment", T::varchar(100)))
                .column(Column::new("Rating", T::int()))
                .column(Column::new("Date_time", T::datetime()))
                .column(Column::new("CID", T::varchar(5)))
                .primary_key(&["itemID"])
                .references("CID", "customers", "CID")
                .references("BID", "bookstore", "BID")
                .references("stockID", "stocks_in_bookstore", "stockID")
                .references("PubID", "publication", "PubID")
                .references("orderID", "orders", "OrderID"),
            Table::new("items_order_status")
                .column(Column::new("date", T::date()))
                .column(Column::new("itemID", T::varchar(5)))
                .column(Column::new("stockID", T::varchar(5)))
                .column(Column::new("BID", T::varchar(5)))
                .column(Column::new("PubID", T::varchar(5)))
                .column(Column::new("state", T::varchar(15)))
                .primary_key(&["date", "itemID", "stockID", "BID", "PubID"])
                .references("itemID", "items_in_orders", "itemID")
                .references("stockID", "stocks_in_bookstore", "stockID")
                .references("BID", "bookstore", "BID")
                .references("PubID", "publication", "PubID"),
        ];

        Self { tables }
    }

    /// Get a table by name
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Get all table names in creation order
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.tables.iter().position(|t| t.name == name)
    }

    /// Order loaded table names so that parents are inserted before children.
    ///
    /// Known tables come first in creation order, unknown names follow
    /// in lexical order.
    pub fn insertion_order<'a, I>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let names: BTreeSet<&str> = names.into_iter().collect();

        let mut ordered: Vec<String> = self
            .tables
            .iter()
            .filter(|t| names.contains(t.name.as_str()))
            .map(|t| t.name.clone())
            .collect();
        ordered.extend(
            names
                .iter()
                .filter(|n| self.position(n).is_none())
                .map(|n| n.to_string()),
        );
        ordered
    }

    /// Order loaded table names so that children are dropped before parents.
    pub fn drop_order<'a, I>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut ordered = self.insertion_order(names);
        ordered.reverse();
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_display() {
        assert_eq!(ColumnType::varchar(5).to_string(), "varchar(5)");
        assert_eq!(ColumnType::int().to_string(), "int");
        assert_eq!(ColumnType::decimal(5, 2).to_string(), "DECIMAL(5,2)");
    }

    #[test]
    fn test_bookstore_has_all_tables() {
        let schema = Schema::bookstore();
        assert_eq!(schema.tables.len(), 15);
        assert_eq!(schema.table_names()[0], "employees");
        assert_eq!(schema.table_names()[14], "items_order_status");
    }

    #[test]
    fn test_foreign_keys_point_backwards() {
        let schema = Schema::bookstore();
        for (idx, table) in schema.tables.iter().enumerate() {
            for fk in &table.foreign_keys {
                let target = schema.position(&fk.table).expect("referenced table exists");
                assert!(target < idx, "{} references later table {}", table.name, fk.table);
                assert!(table.get_column(&fk.column).is_some());
            }
            for pk in &table.primary_keys {
                assert!(table.get_column(pk).is_some(), "{}.{}", table.name, pk);
            }
        }
    }

    #[test]
    fn test_create_statement() {
        let schema = Schema::bookstore();
        let sql = schema.get_table("orders").unwrap().create_statement();
        assert_eq!(
            sql,
            "CREATE TABLE orders (\n\
             \tOrderID varchar(5) NOT NULL,\n\
             \tdate_time datetime NOT NULL,\n\
             \tshipping_address varchar(20) NOT NULL,\n\
             \tCID varchar(5) NOT NULL,\n\
             \tPRIMARY KEY (OrderID),\n\
             \tFOREIGN KEY (CID) REFERENCES customers(CID)\n\
             );"
        );
    }

    #[test]
    fn test_insertion_and_drop_order() {
        let schema = Schema::bookstore();
        let names = ["orders", "zeta", "customers", "alpha"];

        assert_eq!(
            schema.insertion_order(names.iter().copied()),
            vec!["customers", "orders", "alpha", "zeta"]
        );
        assert_eq!(
            schema.drop_order(names.iter().copied()),
            vec!["zeta", "alpha", "orders", "customers"]
        );
    }
}
