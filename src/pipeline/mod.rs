//! Concurrent PCAP-NG reading and dissection
//!
//! One thread parses blocks and reports them, a second thread dissects the Ethernet packets
//! the first one hands over through a bounded queue. The reader dropping its end of the
//! queue tells the dissector there is nothing more to come.
use std::{
    io::Read,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
        mpsc::{Receiver, SyncSender, sync_channel},
    },
    thread,
};

use crate::{
    dissect::{DissectionHandler, Dissector, fragment::DEFAULT_MAX_PENDING_SETS},
    error::FormatError,
    link_type::LinkType,
    pcap_ng::{
        blocks::{
            Block, EnhancedPacketBlock, InterfaceDescriptionBlock, InterfaceStatisticsBlock,
            NameResolutionBlock, PacketBlock, SectionHeaderBlock, SimplePacketBlock,
        },
        sync::SyncPcapNgReader,
    },
};

/// Receives blocks from the reader thread and layers from the dissector thread
///
/// Notifications arrive on both threads, each one synchronously on the thread that produced
/// it. Every method defaults to doing nothing.
pub trait CaptureHandler: DissectionHandler + Sync {
    /// Called for every block before the kind specific method
    fn block_read(&self, _block: &Block) {}
    fn section_header_read(&self, _block: &SectionHeaderBlock) {}
    fn interface_description_read(&self, _block: &InterfaceDescriptionBlock) {}
    fn enhanced_packet_read(&self, _block: &EnhancedPacketBlock) {}
    fn packet_read(&self, _block: &PacketBlock) {}
    fn simple_packet_read(&self, _block: &SimplePacketBlock) {}
    fn name_resolution_read(&self, _block: &NameResolutionBlock) {}
    fn interface_statistics_read(&self, _block: &InterfaceStatisticsBlock) {}
    /// A block whose envelope was fine but whose body could not be decoded
    fn malformed_block(&self, _offset: u64, _error: &FormatError) {}
}

/// Shared stop flag
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);
impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Packet blocks waiting for the dissector before the reader blocks
    pub queue_capacity: usize,
    pub reassemble_fragments: bool,
    pub max_pending_fragment_sets: usize,
}
impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            reassemble_fragments: true,
            max_pending_fragment_sets: DEFAULT_MAX_PENDING_SETS,
        }
    }
}
impl PipelineConfig {
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }
    pub fn with_reassembly(mut self, reassemble_fragments: bool) -> Self {
        self.reassemble_fragments = reassemble_fragments;
        self
    }
    pub fn with_max_pending_fragment_sets(mut self, max_pending_fragment_sets: usize) -> Self {
        self.max_pending_fragment_sets = max_pending_fragment_sets;
        self
    }
    fn dissector(&self) -> Dissector {
        if self.reassemble_fragments {
            Dissector::with_reassembly(self.max_pending_fragment_sets)
        } else {
            Dissector::new()
        }
    }
}

/// Counts gathered by [CapturePipeline::run]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineSummary {
    /// Blocks decoded, the first section header included
    pub blocks_read: u64,
    pub packets_enqueued: u64,
    pub frames_dissected: u64,
    pub malformed_blocks: u64,
    /// Frames where one of the layers could not be parsed
    pub malformed_frames: u64,
    pub cancelled: bool,
}

#[derive(Debug, Default)]
struct ReaderCounts {
    blocks_read: u64,
    packets_enqueued: u64,
    malformed_blocks: u64,
}
#[derive(Debug, Default)]
struct DissectorCounts {
    frames_dissected: u64,
    malformed_frames: u64,
}

/// Reads a PCAP-NG stream and dissects its Ethernet packets on two threads
#[derive(Debug)]
pub struct CapturePipeline<R: Read> {
    reader: Mutex<SyncPcapNgReader<R>>,
    config: PipelineConfig,
    cancellation: CancellationToken,
    /// Whether the section header read on open has been reported
    first_section_reported: AtomicBool,
}

impl<R: Read + Send> CapturePipeline<R> {
    /// Opens the stream, reading the first section header
    pub fn new(reader: R, config: PipelineConfig) -> Result<Self, FormatError> {
        Ok(Self {
            reader: Mutex::new(SyncPcapNgReader::new(reader)?),
            config,
            cancellation: CancellationToken::new(),
            first_section_reported: AtomicBool::new(false),
        })
    }
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
    /// A token that stops [Self::run] from another thread
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }
    /// Offset of the last block read, usable while [Self::run] is in progress
    pub fn last_block_offset(&self) -> u64 {
        self.lock_reader().last_block_offset()
    }

    /// Reads until the end of the stream or cancellation
    ///
    /// Malformed block bodies and frames are counted and reading continues. A broken block
    /// envelope ends the run with an error.
    pub fn run<H: CaptureHandler>(&self, handler: &H) -> Result<PipelineSummary, FormatError> {
        let (sender, receiver) = sync_channel::<Block>(self.config.queue_capacity);
        let (reader, dissector) = thread::scope(|scope| {
            let reader = scope.spawn(|| self.read_blocks(sender, handler));
            let dissector = scope.spawn(|| self.dissect_blocks(receiver, handler));
            (
                reader.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)),
                dissector.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)),
            )
        });
        let reader = reader?;
        let summary = PipelineSummary {
            blocks_read: reader.blocks_read,
            packets_enqueued: reader.packets_enqueued,
            frames_dissected: dissector.frames_dissected,
            malformed_blocks: reader.malformed_blocks,
            malformed_frames: dissector.malformed_frames,
            cancelled: self.cancellation.is_cancelled(),
        };
        log::debug!("Capture pipeline finished: {summary:?}");
        Ok(summary)
    }

    fn lock_reader(&self) -> MutexGuard<'_, SyncPcapNgReader<R>> {
        self.reader.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_blocks<H: CaptureHandler>(
        &self,
        sender: SyncSender<Block>,
        handler: &H,
    ) -> Result<ReaderCounts, FormatError> {
        let mut counts = ReaderCounts::default();
        if !self.first_section_reported.swap(true, Ordering::AcqRel) {
            let section = Block::SectionHeader(self.lock_reader().current_section().clone());
            notify_block(handler, &section);
            counts.blocks_read += 1;
        }
        while !self.cancellation.is_cancelled() {
            let (block, enqueue) = {
                let mut reader = self.lock_reader();
                let Some(raw) = reader.next_raw_block()? else {
                    break;
                };
                match reader.decode_block(raw) {
                    Ok(block) => {
                        let enqueue = is_ethernet_packet(&*reader, &block);
                        (block, enqueue)
                    }
                    Err(err) if err.is_block_local() => {
                        let offset = reader.last_block_offset();
                        drop(reader);
                        log::debug!("Malformed block at offset {offset}: {err}");
                        handler.malformed_block(offset, &err);
                        counts.malformed_blocks += 1;
                        continue;
                    }
                    Err(err) => return Err(err),
                }
            };
            counts.blocks_read += 1;
            notify_block(handler, &block);
            if enqueue {
                if sender.send(block).is_err() {
                    // The dissector stopped, only happens on cancellation
                    break;
                }
                counts.packets_enqueued += 1;
            }
        }
        Ok(counts)
    }

    fn dissect_blocks<H: CaptureHandler>(
        &self,
        receiver: Receiver<Block>,
        handler: &H,
    ) -> DissectorCounts {
        let mut counts = DissectorCounts::default();
        let mut dissector = self.config.dissector();
        while let Ok(block) = receiver.recv() {
            if self.cancellation.is_cancelled() {
                break;
            }
            match dissector.dissect_block(&block, handler) {
                Ok(()) => counts.frames_dissected += 1,
                Err(err) => {
                    log::debug!("Could not dissect {:#010x} block: {err}", block.block_type());
                    counts.malformed_frames += 1;
                }
            }
        }
        counts
    }
}

/// Whether `block` carries a packet captured on a described Ethernet interface
fn is_ethernet_packet<R: Read>(reader: &SyncPcapNgReader<R>, block: &Block) -> bool {
    if !block.is_packet() {
        return false;
    }
    let Some(interface_id) = block.interface_id() else {
        return false;
    };
    match reader.interface(interface_id) {
        Some(interface) => interface.link_type == LinkType::Ethernet,
        None => {
            reader.warn_unusable_interface(interface_id);
            false
        }
    }
}

fn notify_block<H: CaptureHandler + ?Sized>(handler: &H, block: &Block) {
    handler.block_read(block);
    match block {
        Block::SectionHeader(block) => handler.section_header_read(block),
        Block::InterfaceDescription(block) => handler.interface_description_read(block),
        Block::EnhancedPacket(block) => handler.enhanced_packet_read(block),
        Block::Packet(block) => handler.packet_read(block),
        Block::SimplePacket(block) => handler.simple_packet_read(block),
        Block::NameResolution(block) => handler.name_resolution_read(block),
        Block::InterfaceStatistics(block) => handler.interface_statistics_read(block),
        Block::Unknown(_) => {}
    }
}
