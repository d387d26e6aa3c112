//! Archive writer.
//!
//! Writing happens in three passes over the sources:
//!
//! 1. every source is hashed in caller order, and with a size ceiling gets
//!    its data archive and offset;
//! 2. the entries are sorted and the directory tree is encoded;
//! 3. header, tree and payloads are written, re-reading each source and
//!    checking it still hashes the same.

use std::io::{self, BufWriter, Read, Write};

use tracing::{debug, info};
use vpk_common::crc::hash_reader;

use crate::crc_reader::CrcReader;
use crate::fs::Creator;
use crate::path::PathKey;
use crate::source::Source;
use crate::tree::{self, DirectoryEntry, TreeRecord, DIR_INDEX, TERMINATOR};
use crate::{Error, Result};

/// A source together with the directory entry it will be stored under.
struct Planned<'a, S> {
    key: PathKey,
    entry: DirectoryEntry,
    source: &'a S,
}

impl<S> TreeRecord for Planned<'_, S> {
    fn key(&self) -> &PathKey {
        &self.key
    }

    fn entry(&self) -> &DirectoryEntry {
        &self.entry
    }

    fn preload(&self) -> &[u8] {
        &[]
    }
}

/// Write `sources` as a new archive.
///
/// Without `max_archive_size` everything goes into the main file, payloads
/// following the tree in tree order. With it, the main file holds only the
/// tree and payloads are split over numbered data archives: once an archive
/// reaches the ceiling the next file starts a new one, so an archive can
/// exceed the ceiling by at most one file.
///
/// Sources are read twice and must not change in between; a source that
/// comes back shorter fails with [`Error::UnexpectedEof`], one with other
/// contents with [`Error::CrcMismatch`]. Any error leaves the files created
/// so far incomplete.
pub fn create<C, S>(creator: &C, sources: &[S], max_archive_size: Option<u64>) -> Result<()>
where
    C: Creator,
    S: Source,
{
    let mut planned = plan(sources, max_archive_size)?;

    let mut order: Vec<usize> = (0..planned.len()).collect();
    order.sort_by(|&a, &b| planned[a].key.cmp(&planned[b].key));
    if let Some(pair) = order
        .windows(2)
        .find(|w| planned[w[0]].key == planned[w[1]].key)
    {
        return Err(Error::DuplicateEntry(planned[pair[0]].key.to_string()));
    }

    if max_archive_size.is_none() {
        let mut offset: u64 = 0;
        for &i in &order {
            let entry = &mut planned[i].entry;
            (entry.offset, offset) = place(offset, entry.length)?;
        }
    }

    let sorted: Vec<&Planned<'_, S>> = order.iter().map(|&i| &planned[i]).collect();
    let tree = tree::encode(&sorted);
    let tree_length = u32::try_from(tree.len()).map_err(|_| Error::FileTooBig)?;

    let mut main = BufWriter::new(creator.create_main()?);
    tree::write_header(&mut main, tree_length)?;
    main.write_all(&tree)?;

    let archives = match max_archive_size {
        None => {
            for record in &sorted {
                copy_source(record, &mut main)?;
            }
            main.flush()?;
            0
        }
        Some(_) => {
            main.flush()?;
            drop(main);
            write_archives(creator, &planned)?
        }
    };

    info!(
        entries = planned.len(),
        tree_length,
        archives,
        "wrote VPK archive"
    );

    Ok(())
}

/// Pass 1: hash every source and, with a ceiling, place it in a data
/// archive.
fn plan<S: Source>(sources: &[S], max_archive_size: Option<u64>) -> Result<Vec<Planned<'_, S>>> {
    let mut planned = Vec::with_capacity(sources.len());
    let mut archive: u16 = 0;
    let mut offset: u64 = 0;

    for source in sources {
        let (crc, length) = hash_reader(source.open()?)?;
        let length = u32::try_from(length).map_err(|_| Error::FileTooBig)?;

        let mut entry = DirectoryEntry {
            crc,
            preload_bytes: 0,
            archive_index: DIR_INDEX,
            offset: 0,
            length,
            terminator: TERMINATOR,
        };

        if let Some(ceiling) = max_archive_size {
            if archive >= DIR_INDEX as u16 {
                return Err(Error::TooManyArchives);
            }
            entry.archive_index = archive as i16;
            (entry.offset, offset) = place(offset, length)?;
            if offset >= ceiling {
                archive += 1;
                offset = 0;
            }
        }

        planned.push(Planned {
            key: PathKey::new(source.rel()),
            entry,
            source,
        });
    }

    Ok(planned)
}

/// Write payloads into data archives in caller order. Returns the number of
/// archives created.
fn write_archives<C: Creator, S: Source>(creator: &C, planned: &[Planned<'_, S>]) -> Result<u16> {
    let mut count = 0;
    let mut current: Option<(u16, BufWriter<C::File>)> = None;

    for record in planned {
        let index = record.entry.archive_index as u16;

        if current.as_ref().map(|(open, _)| *open) != Some(index) {
            if let Some((_, mut previous)) = current.take() {
                previous.flush()?;
            }
            debug!(index, "creating data archive");
            count += 1;
            current = Some((index, BufWriter::new(creator.create_archive(index)?)));
        }

        if let Some((_, writer)) = current.as_mut() {
            copy_source(record, writer)?;
        }
    }

    if let Some((_, mut writer)) = current {
        writer.flush()?;
    }

    Ok(count)
}

/// Start of a payload at `offset` and the offset just past it. Both ends
/// must be addressable by the u32 fields of a directory entry.
fn place(offset: u64, length: u32) -> Result<(u32, u64)> {
    let start = u32::try_from(offset).map_err(|_| Error::FileTooBig)?;
    let end = offset + u64::from(length);
    if end > u64::from(u32::MAX) {
        return Err(Error::FileTooBig);
    }
    Ok((start, end))
}

/// Pass 3 for one source: copy exactly the hashed number of bytes and
/// check the checksum again. One extra byte is requested so a source that
/// grew since hashing is caught as well as one that shrank.
fn copy_source<S: Source, W: Write>(record: &Planned<'_, S>, out: &mut W) -> Result<()> {
    let length = u64::from(record.entry.length);
    let mut reader = CrcReader::new(record.source.open()?.take(length + 1), record.entry.crc);

    let copied = io::copy(&mut reader, out)?;
    if copied != length {
        return Err(Error::UnexpectedEof);
    }

    reader.finish()
}
