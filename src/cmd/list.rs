use std::cmp::Ordering;
use std::sync::atomic::AtomicBool;

use globset::GlobBuilder;

use crate::cmd::opts::{Field, InfoCmd, ListCmd};
use crate::cmd::style;
use crate::cmd::table::{Alignment, AsRow, Column, ColumnId, Row, Separator, TableView, TextCell};
use crate::cmd::{eprintln, paint, println, Cmd, GlobalArgs, DATE_FORMAT};
use crate::config::Config;
use crate::ocfl::{FileDetails, InventoryPath, ObjectVersionDetails, OcflRepo, Result};

impl Cmd for ListCmd {
    fn exec(
        &self,
        repo: &OcflRepo,
        args: GlobalArgs,
        _config: &Config,
        _terminate: &AtomicBool,
    ) -> Result<()> {
        if self.objects || self.object_id.is_none() {
            list_objects(self, repo, args)
        } else {
            list_object_contents(self, repo, args)
        }
    }
}

fn list_objects(cmd: &ListCmd, repo: &OcflRepo, args: GlobalArgs) -> Result<()> {
    let iter = if cmd.staged {
        repo.list_staged_objects(cmd.object_id.as_deref())?
    } else {
        repo.list_objects(cmd.object_id.as_deref())?
    };

    let mut objects: Vec<ObjectVersionDetails> = iter.collect();

    objects.sort_unstable_by(|a, b| {
        if cmd.reverse {
            cmp_objects(&cmd.sort, b, a)
        } else {
            cmp_objects(&cmd.sort, a, b)
        }
    });

    let mut table = object_table(cmd, args);
    objects.iter().for_each(|object| table.add_row(object));
    table.write_stdio()?;
    Ok(())
}

fn list_object_contents(cmd: &ListCmd, repo: &OcflRepo, args: GlobalArgs) -> Result<()> {
    let object_id = cmd.object_id.as_ref().unwrap();
    let object = if cmd.staged {
        repo.get_staged_object(object_id)?
    } else {
        repo.get_object(object_id, cmd.version)?
    };

    let glob = match cmd.path.as_ref() {
        Some(path) => Some(
            GlobBuilder::new(path)
                .literal_separator(true)
                .backslash_escape(true)
                .build()?
                .compile_matcher(),
        ),
        None => None,
    };

    let mut listings: Vec<ContentListing> = object
        .state
        .into_iter()
        .map(|(path, details)| ContentListing {
            logical_path: path.as_str().to_string(),
            details,
        })
        .filter(|listing| match &glob {
            Some(glob) => glob.is_match(&listing.logical_path),
            None => true,
        })
        .collect();

    listings.sort_unstable_by(|a, b| {
        if cmd.reverse {
            cmp_object_contents(&cmd.sort, b, a)
        } else {
            cmp_object_contents(&cmd.sort, a, b)
        }
    });

    let mut table = object_content_table(cmd, args);
    listings.iter().for_each(|listing| table.add_row(listing));
    table.write_stdio()?;
    Ok(())
}

fn object_table(cmd: &ListCmd, args: GlobalArgs) -> TableView<'static> {
    let mut columns = Vec::new();

    if cmd.long {
        columns.push(Column::new(ColumnId::Version, "Version", Alignment::Right));
        columns.push(Column::new(ColumnId::Created, "Updated", Alignment::Left));
    }

    columns.push(Column::new(ColumnId::ObjectId, "Object ID", Alignment::Left));

    if cmd.physical {
        columns.push(Column::new(
            ColumnId::PhysicalPath,
            "Physical Path",
            Alignment::Left,
        ));
    }

    TableView::new(columns, separator(cmd), cmd.header, !args.no_styles)
}

fn object_content_table(cmd: &ListCmd, args: GlobalArgs) -> TableView<'static> {
    let mut columns = Vec::new();

    if cmd.long {
        columns.push(Column::new(ColumnId::Version, "Version", Alignment::Right));
        columns.push(Column::new(ColumnId::Created, "Updated", Alignment::Left));
    }

    columns.push(Column::new(
        ColumnId::LogicalPath,
        "Logical Path",
        Alignment::Left,
    ));

    if cmd.physical {
        columns.push(Column::new(
            ColumnId::PhysicalPath,
            "Physical Path",
            Alignment::Left,
        ));
    }

    if cmd.digest {
        columns.push(Column::new(ColumnId::Digest, "Digest", Alignment::Left));
    }

    TableView::new(columns, separator(cmd), cmd.header, !args.no_styles)
}

fn separator(cmd: &ListCmd) -> Separator {
    if cmd.tsv {
        Separator::TAB
    } else {
        Separator::SPACE
    }
}

fn cmp_objects(field: &Field, a: &ObjectVersionDetails, b: &ObjectVersionDetails) -> Ordering {
    match field {
        Field::Version => a
            .version_details
            .version_num
            .number
            .cmp(&b.version_details.version_num.number),
        Field::Updated => a.version_details.created.cmp(&b.version_details.created),
        Field::Physical => a.object_root.cmp(&b.object_root),
        _ => natord::compare(&a.id, &b.id),
    }
}

fn cmp_object_contents(field: &Field, a: &ContentListing, b: &ContentListing) -> Ordering {
    match field {
        Field::Version => a
            .details
            .last_update
            .version_num
            .number
            .cmp(&b.details.last_update.version_num.number),
        Field::Updated => a
            .details
            .last_update
            .created
            .cmp(&b.details.last_update.created),
        Field::Physical => natord::compare(&a.details.storage_path, &b.details.storage_path),
        Field::Digest => a.details.digest.cmp(&b.details.digest),
        _ => natord::compare(&a.logical_path, &b.logical_path),
    }
}

struct ContentListing {
    logical_path: String,
    details: FileDetails,
}

impl<'a> AsRow<'a> for ContentListing {
    fn as_row(&'a self, columns: &[Column]) -> Row<'a> {
        let mut cells = Vec::new();

        for column in columns {
            let cell = match column.id {
                ColumnId::Version => TextCell::new(self.details.last_update.version_num.to_string())
                    .with_style(&style::GREEN),
                ColumnId::Created => TextCell::new(
                    self.details
                        .last_update
                        .created
                        .format(DATE_FORMAT)
                        .to_string(),
                )
                .with_style(&style::YELLOW),
                ColumnId::LogicalPath => {
                    TextCell::new_ref(&self.logical_path).with_style(&style::BOLD)
                }
                ColumnId::PhysicalPath => TextCell::new_ref(&self.details.storage_path),
                ColumnId::Digest => TextCell::new(format!(
                    "{}:{}",
                    self.details.digest_algorithm, self.details.digest
                )),
                _ => TextCell::blank(),
            };

            cells.push(cell);
        }

        Row::new(cells)
    }
}

impl<'a> AsRow<'a> for ObjectVersionDetails {
    fn as_row(&'a self, columns: &[Column]) -> Row<'a> {
        let mut cells = Vec::new();

        for column in columns {
            let cell = match column.id {
                ColumnId::Version => {
                    TextCell::new(self.version_details.version_num.to_string())
                        .with_style(&style::GREEN)
                }
                ColumnId::Created => TextCell::new(
                    self.version_details.created.format(DATE_FORMAT).to_string(),
                )
                .with_style(&style::YELLOW),
                ColumnId::ObjectId => TextCell::new_ref(&self.id).with_style(&style::BOLD),
                ColumnId::PhysicalPath => TextCell::new_ref(&self.object_root),
                _ => TextCell::blank(),
            };

            cells.push(cell);
        }

        Row::new(cells)
    }
}

impl Cmd for InfoCmd {
    fn exec(
        &self,
        repo: &OcflRepo,
        args: GlobalArgs,
        _config: &Config,
        _terminate: &AtomicBool,
    ) -> Result<()> {
        match &self.object_id {
            Some(object_id) => {
                let details = if self.staged {
                    repo.get_staged_object_details(object_id)?
                } else {
                    repo.get_object_details(object_id, None)?
                };

                println(format!(
                    "{}: {}",
                    paint(args.no_styles, *style::BOLD, "Object ID"),
                    details.id
                ))?;
                println(format!(
                    "{}: {}",
                    paint(args.no_styles, *style::BOLD, "Object Root"),
                    details.object_root
                ))?;
                println(format!(
                    "{}: {}",
                    paint(args.no_styles, *style::BOLD, "Digest Algorithm"),
                    details.digest_algorithm
                ))?;
                println(format!(
                    "{}: {}",
                    paint(args.no_styles, *style::BOLD, "Head Version"),
                    details.version_details.version_num
                ))
            }
            None => {
                eprintln("No object specified; repository-level info is not yet available");
                Ok(())
            }
        }
    }
}
