// Revision scripts for the integration tests. Discovered by file name; this
// file is never compiled.
